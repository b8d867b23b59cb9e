//! Check command implementation
//!
//! Implements `slnresolve check` to report hint paths that tie the source tree to one
//! location. Warnings do not fail the command.

use anyhow::Result;

use super::session::Session;
use crate::cli::output::{is_json, print_success, print_warning};

/// Execute the check command
///
/// The session validated the projects when it indexed them.
pub fn execute(session: &Session) -> Result<()> {
    let warnings = &session.warnings;

    if is_json() {
        let json = serde_json::json!({
            "projects": session.index.all_projects().count(),
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if warnings.is_empty() {
        print_success(&format!(
            "Checked {} project(s), no problems found",
            session.index.all_projects().count()
        ));
    } else {
        print_warning(&format!("{} problem(s) found", warnings.len()));
    }
    Ok(())
}
