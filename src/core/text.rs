//! Text helpers for log output

/// Indent every line with a tab
pub fn tabify<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    lines
        .into_iter()
        .map(|line| format!("\t{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summarize a list as its count and first element: `3 <what> [First, ...]`
///
/// Returns `None` for an empty list.
pub fn count_with_sample<T: std::fmt::Display>(items: &[T], what: &str) -> Option<String> {
    let first = items.first()?;
    let more = if items.len() > 1 { ", ..." } else { "" };
    Some(format!("{} {what} [{first}{more}]", items.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabify() {
        assert_eq!(tabify("a\nb".lines()), "\ta\n\tb");
        assert_eq!(tabify(std::iter::empty()), "");
    }

    #[test]
    fn test_count_with_sample() {
        assert_eq!(count_with_sample::<String>(&[], "items"), None);
        assert_eq!(count_with_sample(&["Lib"], "items").as_deref(), Some("1 items [Lib]"));
        assert_eq!(
            count_with_sample(&["Lib", "Core"], "unknown").as_deref(),
            Some("2 unknown [Lib, ...]")
        );
    }
}
