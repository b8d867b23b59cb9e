//! Order command implementation
//!
//! Implements `slnresolve order` to print solutions or projects in build order.

use anyhow::Result;

use super::session::Session;
use crate::cli::output::is_json;
use crate::core::resolver::{build_order, project_build_order};

/// Execute the order command
pub fn execute(session: &Session, projects: bool) -> Result<()> {
    let info = session.dependency_info()?;

    let order: Vec<String> = if projects {
        project_build_order(&session.index, &info.project_graph)?
            .into_iter()
            .map(|id| session.index.project(id).path.display().to_string())
            .collect()
    } else {
        build_order(&info.trimmed_solution_graph)?
            .iter()
            .map(|s| s.display().to_string())
            .collect()
    };

    if is_json() {
        let json = serde_json::json!({
            "kind": if projects { "projects" } else { "solutions" },
            "order": order,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    for line in &order {
        println!("{line}");
    }
    Ok(())
}
