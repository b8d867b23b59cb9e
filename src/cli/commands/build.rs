//! Build command implementation
//!
//! Implements `slnresolve build`: component update, clean, build and optional tests for
//! every solution in dependency order.

use anyhow::Result;

use super::session::Session;
use super::FilterArgs;
use crate::cli::output::{create_build_bar, is_json, print_success, print_warning};
use crate::core::builder::{
    orchestrate, BuildContext, BuildPolicy, BuildStep, Mode, SolutionAction, SolutionOutcome,
};
use crate::core::resolver::DependencyInfo;
use crate::infra::metadata::ClrMetadataReader;
use crate::infra::process::SystemProcessRunner;

/// Build options
pub struct BuildOptions {
    pub no_clean: bool,
    pub run_tests: bool,
    pub ignore_failed_tests: bool,
}

/// Execute the build command
pub fn execute(session: &Session, filter: &FilterArgs, options: &BuildOptions) -> Result<()> {
    let build = &session.settings.build;
    let run_tests = options.run_tests || build.run_tests.unwrap_or(false);

    let mut policy = session.update_policy(filter)?;
    policy.clean_before_build = !options.no_clean && session.settings.clean();
    policy.run_tests = run_tests;
    policy.ignore_failed_tests = options.ignore_failed_tests || build.ignore_failed_tests.unwrap_or(false);
    policy.tools = session.tool_paths(run_tests)?;

    let info = session.dependency_info()?;
    run(session, &policy, &info, Mode::Build)
}

/// Orchestrate `mode` with a progress bar and print the outcome
pub(super) fn run(session: &Session, policy: &BuildPolicy, info: &DependencyInfo, mode: Mode) -> Result<()> {
    let ctx = BuildContext {
        index: &session.index,
        policy,
        reader: &ClrMetadataReader,
        runner: &SystemProcessRunner,
    };

    let bar = create_build_bar(info.trimmed_solution_graph.vertex_count() as u64);
    let result = orchestrate(&ctx, &info.trimmed_solution_graph, mode, &mut |step: BuildStep<'_>| {
        bar.set_length(step.total as u64);
        bar.set_position(step.position as u64);
        bar.set_message(
            step.solution
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
    });
    match &result {
        Ok(_) => bar.finish_and_clear(),
        Err(_) => bar.abandon(),
    }
    let outcomes = result?;

    report(&outcomes)
}

fn report(outcomes: &[SolutionOutcome]) -> Result<()> {
    if is_json() {
        let json = serde_json::json!({
            "solutions": outcomes.iter().map(|o| serde_json::json!({
                "solution": o.solution.display().to_string(),
                "action": o.action,
                "copied": o.report.copied.iter().map(|c| c.reference.short_name()).collect::<Vec<_>>(),
                "ignored": o.report.ignored.len(),
                "bad_hint_path": o.report.bad_hint_path.len(),
                "missing_project": o.report.missing_project.len(),
                "unbuilt_project": o.report.unbuilt_project.len(),
                "outside_solution": o.report.outside_solution.iter()
                    .map(|r| r.indirect_reference.short_name())
                    .collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    let built = outcomes.iter().filter(|o| o.action == SolutionAction::Build).count();
    let updated = outcomes.len() - built;
    let outside: usize = outcomes.iter().map(|o| o.report.outside_solution.len()).sum();
    if outside > 0 {
        print_warning(&format!(
            "{outside} indirect reference(s) come from other solutions and were not copied"
        ));
    }
    print_success(&format!(
        "Done: {built} solution(s) built, {updated} solution(s) with updated components"
    ));
    Ok(())
}
