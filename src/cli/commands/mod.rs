//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod check;
pub mod export;
pub mod graph;
pub mod order;
pub mod session;
pub mod update;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use session::Session;

/// Input selection shared by every command
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Root of the source tree; every project and solution under it is indexed
    #[arg(short = 'b', long = "base-path", value_name = "DIR")]
    pub base_path: PathBuf,

    /// Input .csproj and .sln files
    #[arg(value_name = "INPUTS")]
    pub inputs: Vec<PathBuf>,

    /// Use every solution under the base path as input
    #[arg(long)]
    pub all_slns: bool,

    /// Solution to leave out of build order and builds (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "SLN")]
    pub exclude: Vec<PathBuf>,

    /// Maximum dependency depth to follow (-1 for unlimited)
    #[arg(short = 'r', long, value_name = "N", allow_negative_numbers = true)]
    pub recursion_level: Option<i32>,
}

/// Assembly name filter shared by the component commands
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only copy assemblies whose name matches (regex, repeatable)
    #[arg(short = 'm', long = "match-assembly", value_name = "REGEX")]
    pub patterns: Vec<String>,

    /// Copy only assemblies that do NOT match any --match-assembly pattern
    #[arg(long)]
    pub flip_ignore: bool,

    /// Skip projects that were never built and files that are missing
    #[arg(long)]
    pub ignore_missing: bool,
}

/// Graph text format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphFormat {
    /// Graphviz DOT
    #[default]
    Dot,
    /// One `from -> to` line per edge
    Edges,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the build order
    Order {
        #[command(flatten)]
        common: CommonArgs,

        /// Print projects instead of solutions
        #[arg(long)]
        projects: bool,
    },

    /// Export the dependency graph
    Graph {
        #[command(flatten)]
        common: CommonArgs,

        /// Export the project graph instead of the solution graph
        #[arg(long)]
        projects: bool,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: GraphFormat,

        /// Render the DOT output with Graphviz into this format (requires --output)
        #[arg(long, value_name = "FORMAT")]
        render: Option<String>,
    },

    /// Copy built components into the input solutions
    Update {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Build the dependency solutions first
        #[arg(short = 'c', long)]
        compile: bool,
    },

    /// Build every solution in dependency order
    Build {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Don't clean before building
        #[arg(long)]
        no_clean: bool,

        /// Run tests after building each solution
        #[arg(short = 't', long)]
        run_tests: bool,

        /// Keep going when tests fail
        #[arg(long)]
        ignore_failed_tests: bool,
    },

    /// Generate build descriptors
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },

    /// Report hint paths that break relocation of the source tree
    Check {
        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// MSBuild project that builds the solutions in dependency order
    Msbuild {
        #[command(flatten)]
        common: CommonArgs,

        /// Write one build.proj next to each solution instead of a single file
        #[arg(long)]
        split: bool,

        /// Directory for the single build.proj (default: current directory)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// NuGet .nuspec next to each project
    Nuspec {
        #[command(flatten)]
        common: CommonArgs,

        /// Leave out dependencies (for nuget -IncludeReferencedProjects)
        #[arg(long)]
        no_deps: bool,
    },

    /// NuGet packages.config next to each project, versions from `nuget list`
    PackagesConfig {
        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Commands {
    /// Execute the command
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        match self {
            Self::Order { common, projects } => {
                let session = Session::open(&common, config)?;
                order::execute(&session, projects)
            }
            Self::Graph {
                common,
                projects,
                output,
                format,
                render,
            } => {
                let session = Session::open(&common, config)?;
                let options = graph::GraphOptions {
                    projects,
                    output,
                    format,
                    render,
                };
                graph::execute(&session, &options)
            }
            Self::Update {
                common,
                filter,
                compile,
            } => {
                let session = Session::open(&common, config)?;
                update::execute(&session, &filter, compile)
            }
            Self::Build {
                common,
                filter,
                no_clean,
                run_tests,
                ignore_failed_tests,
            } => {
                let session = Session::open(&common, config)?;
                let options = build::BuildOptions {
                    no_clean,
                    run_tests,
                    ignore_failed_tests,
                };
                build::execute(&session, &filter, &options)
            }
            Self::Export { command } => match command {
                ExportCommands::Msbuild {
                    common,
                    split,
                    output_dir,
                } => {
                    let session = Session::open(&common, config)?;
                    let output_dir = match output_dir {
                        Some(dir) => dir,
                        None => std::env::current_dir()?,
                    };
                    export::execute_msbuild(&session, &output_dir, split)
                }
                ExportCommands::Nuspec { common, no_deps } => {
                    let session = Session::open(&common, config)?;
                    export::execute_nuspec(&session, no_deps)
                }
                ExportCommands::PackagesConfig { common } => {
                    let session = Session::open(&common, config)?;
                    export::execute_packages_config(&session)
                }
            },
            Self::Check { common } => {
                let session = Session::open(&common, config)?;
                check::execute(&session)
            }
        }
    }
}
