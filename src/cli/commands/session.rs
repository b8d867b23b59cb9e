//! Per-invocation state shared by the commands
//!
//! Loads settings, indexes the base path and turns the command line into inputs,
//! exclusions and build policies.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::{CommonArgs, FilterArgs};
use crate::core::builder::{resolve_tool, BuildPolicy, ToolPaths};
use crate::core::check::{validate_projects, ValidationWarning};
use crate::core::filter::{FilterMode, NameFilter};
use crate::core::index::{IndexOptions, NameCollisionPolicy, ProjectIndex};
use crate::core::resolver::{get_dependency_info, DependencyInfo};
use crate::core::settings::{Settings, SettingsSource};
use crate::infra::filesystem::canonical_path;

/// Index, settings and inputs for one command
#[derive(Debug)]
pub struct Session {
    pub settings: Settings,
    pub index: ProjectIndex,
    pub inputs: Vec<PathBuf>,
    pub excluded: Vec<PathBuf>,
    pub recursion_level: i32,
    /// Hint path problems found while indexing, already logged
    pub warnings: Vec<ValidationWarning>,
}

impl Session {
    pub fn open(common: &CommonArgs, config: Option<&Path>) -> Result<Self> {
        let base_path = canonical_path(&common.base_path)
            .with_context(|| format!("Invalid base path '{}'", common.base_path.display()))?;
        if !base_path.is_dir() {
            bail!("Invalid base path '{}': not a directory", common.base_path.display());
        }

        let (settings, source) = Settings::discover(config, &base_path)?;
        if let SettingsSource::File(path) = &source {
            tracing::info!("Loaded settings from {}", path.display());
        }

        let options = IndexOptions {
            name_collisions: if settings.index.fail_on_name_collision.unwrap_or(false) {
                NameCollisionPolicy::Fail
            } else {
                NameCollisionPolicy::Warn
            },
        };
        let index = ProjectIndex::build(&base_path, &options)
            .with_context(|| format!("Failed to index '{}'", base_path.display()))?;
        tracing::info!(
            "Indexed {} project(s) and {} solution(s) under {}",
            index.all_projects().count(),
            index.solutions().len(),
            base_path.display()
        );

        let warnings = validate_projects(&index);

        let mut inputs = common.inputs.clone();
        if common.all_slns {
            let mut all = index.solutions_with_projects();
            all.sort();
            inputs.extend(all);
        }

        Ok(Self {
            recursion_level: common.recursion_level.unwrap_or_else(|| settings.recursion_level()),
            settings,
            index,
            inputs,
            excluded: common.exclude.clone(),
            warnings,
        })
    }

    /// Dependency graphs of the inputs
    pub fn dependency_info(&self) -> Result<DependencyInfo> {
        if self.inputs.is_empty() {
            bail!("No inputs: pass .csproj/.sln files or use --all-slns");
        }
        Ok(get_dependency_info(
            &self.index,
            &self.inputs,
            &self.excluded,
            self.recursion_level,
        )?)
    }

    /// Name filter from the command line, falling back to the settings file
    pub fn name_filter(&self, args: &FilterArgs) -> Result<NameFilter> {
        let patterns = if args.patterns.is_empty() {
            &self.settings.filter.patterns
        } else {
            &args.patterns
        };
        let flip = args.flip_ignore || self.settings.filter.flip.unwrap_or(false);
        Ok(NameFilter::new(patterns, FilterMode::from_flip(flip))?)
    }

    /// Policy for component updates without building
    pub fn update_policy(&self, args: &FilterArgs) -> Result<BuildPolicy> {
        Ok(BuildPolicy {
            filter: self.name_filter(args)?,
            ignore_missing: args.ignore_missing || self.settings.build.ignore_missing.unwrap_or(false),
            clean_before_build: self.settings.clean(),
            run_tests: false,
            ignore_failed_tests: false,
            tools: ToolPaths::default(),
        })
    }

    /// Locate the build tool, and the test runner when tests will run
    pub fn tool_paths(&self, run_tests: bool) -> Result<ToolPaths> {
        let msbuild = resolve_tool(&self.settings.msbuild())?;
        let test_runner = if run_tests {
            resolve_tool(&self.settings.test_runner())?
        } else {
            self.settings.test_runner()
        };
        Ok(ToolPaths {
            msbuild,
            test_runner,
            test_framework_prefix: self.settings.test_framework_prefix().to_string(),
        })
    }
}
