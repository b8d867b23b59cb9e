//! Update command implementation
//!
//! Implements `slnresolve update` to copy built components into the solutions nothing
//! else depends on, optionally building their dependency solutions first (`-c`).

use anyhow::Result;

use super::session::Session;
use super::FilterArgs;
use crate::core::builder::Mode;

/// Execute the update command
pub fn execute(session: &Session, filter: &FilterArgs, compile: bool) -> Result<()> {
    let mut policy = session.update_policy(filter)?;
    if compile {
        policy.tools = session.tool_paths(false)?;
    }

    let info = session.dependency_info()?;
    super::build::run(
        session,
        &policy,
        &info,
        Mode::UpdateComponents {
            build_dependencies: compile,
        },
    )
}
