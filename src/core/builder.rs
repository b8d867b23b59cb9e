//! Build orchestration
//!
//! Sequences component updates, clean, build and test runs per solution in build order.
//! Solutions are processed one at a time; nothing is rolled back when a step fails.

use std::path::{Path, PathBuf};

use crate::config::defaults::{DEFAULT_MSBUILD, DEFAULT_TEST_FRAMEWORK_PREFIX, DEFAULT_TEST_RUNNER};
use crate::core::filter::NameFilter;
use crate::core::graph::DependencyGraph;
use crate::core::index::ProjectIndex;
use crate::core::project::ProjectId;
use crate::core::propagate::{propagate_components, PropagationOptions, PropagationReport};
use crate::core::resolver::build_order;
use crate::error::{BuildError, ProcessError};
use crate::infra::filesystem::has_extension;
use crate::infra::metadata::ReferenceReader;
use crate::infra::process::{run_checked, ProcessRunner};

/// External tools used by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub msbuild: PathBuf,
    pub test_runner: PathBuf,
    /// Projects referencing an assembly whose name starts with this are test projects
    pub test_framework_prefix: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            msbuild: PathBuf::from(DEFAULT_MSBUILD),
            test_runner: PathBuf::from(DEFAULT_TEST_RUNNER),
            test_framework_prefix: DEFAULT_TEST_FRAMEWORK_PREFIX.to_string(),
        }
    }
}

/// Locate a tool: absolute paths must exist, bare names are looked up on `PATH`
pub fn resolve_tool(tool: &Path) -> Result<PathBuf, BuildError> {
    if tool.is_absolute() {
        return if tool.is_file() {
            Ok(tool.to_path_buf())
        } else {
            Err(BuildError::ToolNotFound {
                tool: tool.display().to_string(),
            })
        };
    }
    which::which(tool).map_err(|_| BuildError::ToolNotFound {
        tool: tool.display().to_string(),
    })
}

/// How solutions are built
#[derive(Debug, Clone, Default)]
pub struct BuildPolicy {
    pub filter: NameFilter,
    pub ignore_missing: bool,
    pub clean_before_build: bool,
    pub run_tests: bool,
    pub ignore_failed_tests: bool,
    pub tools: ToolPaths,
}

/// Everything a build step needs
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub index: &'a ProjectIndex,
    pub policy: &'a BuildPolicy,
    pub reader: &'a dyn ReferenceReader,
    pub runner: &'a dyn ProcessRunner,
}

impl BuildContext<'_> {
    fn propagation_options(&self) -> PropagationOptions<'_> {
        PropagationOptions {
            filter: &self.policy.filter,
            ignore_missing: self.policy.ignore_missing,
        }
    }
}

/// What `orchestrate` does with the ordered solutions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Build every solution
    Build,
    /// Update components of the solutions nothing depends on, optionally building the
    /// others first
    UpdateComponents { build_dependencies: bool },
}

/// Action taken on one solution
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionAction {
    Build,
    UpdateComponents,
}

/// Step about to run, passed to the observer
#[derive(Debug, Clone, Copy)]
pub struct BuildStep<'a> {
    pub solution: &'a Path,
    pub action: SolutionAction,
    /// Zero-based position among the steps of this run
    pub position: usize,
    pub total: usize,
}

/// Result of one orchestrated step
#[derive(Debug, Clone)]
pub struct SolutionOutcome {
    pub solution: PathBuf,
    pub action: SolutionAction,
    pub report: PropagationReport,
}

/// Update components, clean, build and optionally test one solution
pub fn build_solution(ctx: &BuildContext<'_>, solution: &Path) -> Result<PropagationReport, BuildError> {
    tracing::info!("Building solution: '{}'", solution.display());
    let report = update_components(ctx, solution)?;
    warn_unavailable_references(ctx, solution)?;

    if ctx.policy.clean_before_build {
        tracing::debug!("\tCleaning...");
        msbuild(ctx, solution, Some("/t:clean"))?;
    }
    tracing::debug!("\tBuilding...");
    msbuild(ctx, solution, None)?;

    if ctx.policy.run_tests {
        tracing::debug!("\tRunning tests is enabled, looking for tests to run...");
        run_solution_tests(ctx, solution)?;
    }
    tracing::info!("Done: {} ('{}')", display_name(solution), solution.display());
    Ok(report)
}

/// Copy the components `solution` needs from already built projects
pub fn update_components(ctx: &BuildContext<'_>, solution: &Path) -> Result<PropagationReport, BuildError> {
    Ok(propagate_components(
        ctx.index,
        solution,
        &ctx.propagation_options(),
        ctx.reader,
    )?)
}

/// Run `mode` over the solutions of `graph` in build order
pub fn orchestrate(
    ctx: &BuildContext<'_>,
    graph: &DependencyGraph<PathBuf>,
    mode: Mode,
    observer: &mut dyn FnMut(BuildStep<'_>),
) -> Result<Vec<SolutionOutcome>, BuildError> {
    let order = build_order(graph)?;

    let mut steps: Vec<(&PathBuf, SolutionAction)> = Vec::with_capacity(order.len());
    match mode {
        Mode::Build => steps.extend(order.iter().map(|s| (s, SolutionAction::Build))),
        Mode::UpdateComponents { build_dependencies } => {
            if build_dependencies {
                steps.extend(
                    order
                        .iter()
                        .filter(|s| graph.has_out_edges(s))
                        .map(|s| (s, SolutionAction::Build)),
                );
            }
            steps.extend(
                order
                    .iter()
                    .filter(|s| !graph.has_out_edges(s))
                    .map(|s| (s, SolutionAction::UpdateComponents)),
            );
        }
    }

    let total = steps.len();
    let mut outcomes = Vec::with_capacity(total);
    for (position, (solution, action)) in steps.into_iter().enumerate() {
        observer(BuildStep {
            solution,
            action,
            position,
            total,
        });
        let report = match action {
            SolutionAction::Build => build_solution(ctx, solution)?,
            SolutionAction::UpdateComponents => update_components(ctx, solution)?,
        };
        outcomes.push(SolutionOutcome {
            solution: solution.clone(),
            action,
            report,
        });
    }
    Ok(outcomes)
}

fn msbuild(ctx: &BuildContext<'_>, solution: &Path, target: Option<&str>) -> Result<(), BuildError> {
    let mut args = vec![
        "/nologo".to_string(),
        "/v:quiet".to_string(),
        solution.display().to_string(),
    ];
    args.extend(target.map(ToString::to_string));

    run_checked(
        ctx.runner,
        &ctx.policy.tools.msbuild,
        &args,
        &display_name(solution),
        &format!("Build failed: {}", solution.display()),
    )
    .map(|_| ())
    .map_err(|source| BuildError::BuildFailed {
        solution: solution.to_path_buf(),
        source,
    })
}

/// Warn about filtered-in references whose hint path points at a missing file
fn warn_unavailable_references(ctx: &BuildContext<'_>, solution: &Path) -> Result<(), BuildError> {
    for &id in ctx.index.projects_of_solution(solution)? {
        let project = ctx.index.project(id);
        for reference in &project.assembly_references {
            if !ctx.policy.filter.includes(&reference.name) {
                continue;
            }
            if let Some(hint_path) = reference.hint_path.as_deref().filter(|p| !p.is_file()) {
                tracing::warn!(
                    "Assembly reference '{}' of project {} is not available: '{}' does not exist",
                    reference.name,
                    project,
                    hint_path.display()
                );
            }
        }
    }
    Ok(())
}

fn run_solution_tests(ctx: &BuildContext<'_>, solution: &Path) -> Result<(), BuildError> {
    let prefix = &ctx.policy.tools.test_framework_prefix;
    for &id in ctx.index.projects_of_solution(solution)? {
        let project = ctx.index.project(id);
        if project
            .assembly_references
            .iter()
            .any(|r| r.short_name().starts_with(prefix.as_str()))
        {
            tracing::debug!("\tRunning tests: {}", project.name);
            run_project_tests(ctx, id)?;
        }
    }
    Ok(())
}

fn run_project_tests(ctx: &BuildContext<'_>, id: ProjectId) -> Result<(), BuildError> {
    let project = ctx.index.project(id);
    let outputs = ctx.index.built_outputs(id)?;
    if outputs.is_empty() {
        tracing::debug!("Project {} has no outputs, no tests to run", project.name);
        return Ok(());
    }

    for output in outputs.iter().filter(|o| has_extension(o, "dll")) {
        let label = format!("Project: {}, Output: {}", project.name, display_name(output));
        let args = vec![
            "/nologo".to_string(),
            "/usestderr".to_string(),
            format!("/testcontainer:{}", output.display()),
        ];
        let result = run_checked(
            ctx.runner,
            &ctx.policy.tools.test_runner,
            &args,
            &label,
            &format!("Tests failed: {label}"),
        );
        match result {
            Ok(_) => {}
            Err(ProcessError::FailedExitCode { .. }) if ctx.policy.ignore_failed_tests => {
                tracing::info!("Ignoring failed tests in {label}");
            }
            Err(source) => {
                return Err(BuildError::TestsFailed {
                    project: project.name.clone(),
                    output: output.clone(),
                    source,
                });
            }
        }
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
