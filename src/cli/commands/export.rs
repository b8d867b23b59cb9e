//! Export command implementation
//!
//! Implements `slnresolve export msbuild`, `slnresolve export nuspec` and
//! `slnresolve export packages-config`.

use std::path::Path;

use anyhow::Result;

use super::session::Session;
use crate::cli::output::{is_json, print_success};
use crate::core::builder::resolve_tool;
use crate::core::export::{msbuild_driver, nuspec, packages_config, write_all, GeneratedFile};
use crate::infra::process::SystemProcessRunner;

/// Write MSBuild driver projects
pub fn execute_msbuild(session: &Session, output_dir: &Path, split: bool) -> Result<()> {
    let info = session.dependency_info()?;
    let files = msbuild_driver(&info, output_dir, split)?;
    finish(&files)
}

/// Write a `.nuspec` next to each project of the project graph
pub fn execute_nuspec(session: &Session, no_deps: bool) -> Result<()> {
    let info = session.dependency_info()?;
    let files = nuspec(&session.index, &info.project_graph, no_deps);
    finish(&files)
}

/// Write a `packages.config` next to each project of the project graph
pub fn execute_packages_config(session: &Session) -> Result<()> {
    let info = session.dependency_info()?;
    let nuget = resolve_tool(&session.settings.nuget())?;
    let files = packages_config(&session.index, &info.project_graph, &SystemProcessRunner, &nuget)?;
    finish(&files)
}

fn finish(files: &[GeneratedFile]) -> Result<()> {
    write_all(files)?;

    if is_json() {
        let json = serde_json::json!({
            "files": files.iter().map(|f| f.path.display().to_string()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        print_success(&format!("Generated {} file(s)", files.len()));
    }
    Ok(())
}
