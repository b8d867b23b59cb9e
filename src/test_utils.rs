//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a dotted assembly name like `MyCompany.Core2`
    pub fn assembly_name() -> impl Strategy<Value = String> {
        proptest::collection::vec("[A-Z][a-zA-Z0-9]{0,8}", 1..4).prop_map(|parts| parts.join("."))
    }

    /// Generate a strong assembly name: a short name plus version and culture
    pub fn strong_assembly_name() -> impl Strategy<Value = String> {
        (assembly_name(), 0u32..10, 0u32..10).prop_map(|(name, major, minor)| {
            format!("{name}, Version={major}.{minor}.0.0, Culture=neutral, PublicKeyToken=null")
        })
    }

    /// Generate acyclic edges over `0..vertices`: every edge points to a larger vertex
    pub fn dag_edges(vertices: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
        let vertices = vertices.max(2);
        proptest::collection::vec((0..vertices - 1, 1..vertices), 0..vertices * 2).prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(from, to)| from < to)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_assembly_name_generator(name in assembly_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(!name.contains(','));
            prop_assert!(name.split('.').all(|part| !part.is_empty()));
        }

        #[test]
        fn test_strong_assembly_name_short_name(name in strong_assembly_name()) {
            let short = crate::core::project::short_assembly_name(&name);
            prop_assert!(!short.contains(','));
            prop_assert!(name.starts_with(short));
        }

        #[test]
        fn test_dag_edges_point_forward(edges in dag_edges(10)) {
            prop_assert!(edges.iter().all(|(from, to)| from < to && *to < 10));
        }
    }
}
