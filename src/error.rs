//! Error types for slnresolve
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Project file errors
#[derive(Error, Debug)]
pub enum ProjectError {
    /// Project file does not exist
    #[error("File does not exist: '{path}'")]
    FileNotFound { path: PathBuf },

    /// IO error while reading a project file or its outputs
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// Malformed project XML
    #[error("Failed to parse project XML '{path}': {error}")]
    Xml { path: PathBuf, error: String },

    /// No `AssemblyName` property
    #[error("Project '{path}' does not declare an AssemblyName")]
    MissingAssemblyName { path: PathBuf },

    /// A single reference declared more than one hint path
    #[error("Assembly reference '{assembly}' has multiple HintPaths: '{hint_path}' (in project {project})")]
    MultipleHintPaths {
        assembly: String,
        hint_path: String,
        project: PathBuf,
    },

    /// A `ProjectReference` points to a file that does not exist
    #[error("Error when trying to resolve referenced project '{referenced}' from '{project}': file does not exist")]
    ReferencedProjectMissing { project: PathBuf, referenced: PathBuf },

    /// None of the declared configurations matches the default labels
    #[error("Project '{project}' has no configuration matching its default '{configuration}|{platform}'")]
    NoDefaultConfiguration {
        project: String,
        configuration: String,
        platform: String,
    },

    /// Output directory is missing when outputs were requested
    #[error("Outputs of project '{project}' are not available, output directory does not exist: '{path}'")]
    OutputsUnavailable { project: String, path: PathBuf },
}

/// Solution file errors
#[derive(Error, Debug)]
pub enum SolutionError {
    /// IO error while reading a solution file
    #[error("Failed to read solution '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Project index errors
#[derive(Error, Debug)]
pub enum IndexError {
    /// Search root does not exist
    #[error("Directory does not exist: {path}")]
    RootNotFound { path: PathBuf },

    /// Directory traversal failed
    #[error("Failed to scan '{path}': {error}")]
    Walk { path: PathBuf, error: String },

    /// Project parse error
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Solution read error
    #[error(transparent)]
    Solution(#[from] SolutionError),

    /// Two distinct projects build an assembly with the same name
    #[error("Assembly name '{name}' is built by more than one project: {}", display_paths(projects))]
    AmbiguousAssemblyName { name: String, projects: Vec<PathBuf> },

    /// A project is a member of two solutions
    #[error("Project '{project}' belongs to more than one solution: '{first}' and '{second}'")]
    ProjectInMultipleSolutions {
        project: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    /// A project is not a member of any indexed solution
    #[error("No solution found for project '{project}'")]
    NoOwningSolution { project: PathBuf },

    /// Path is not an indexed solution
    #[error("Solution '{path}' was not found under the base path")]
    UnknownSolution { path: PathBuf },

    /// Path is not an indexed project
    #[error("Project '{path}' was not found under the base path")]
    UnknownProject { path: PathBuf },
}

/// Graph algorithm errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Topological sort was asked of a graph with a cycle
    #[error("Graph is not acyclic: {}", cycle.join(" -> "))]
    NotAcyclic { cycle: Vec<String> },
}

/// Dependency resolution errors
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Input file is neither a project nor a solution
    #[error("Unknown file type: '{extension}' in {}", display_paths(files))]
    UnknownFileKind { extension: String, files: Vec<PathBuf> },

    /// Excluded file is not a solution
    #[error("Excluded files must have extension: .sln (got '{path}')")]
    InvalidExclusion { path: PathBuf },

    /// Solution graph has a cycle and cannot be ordered
    #[error(
        "Cyclic dependency found: {}. Exclude one of these solutions with --exclude to break the cycle, \
         and use 'slnresolve graph' to inspect the full dependency graph",
        cycle.join(" -> ")
    )]
    CyclicSolutionGraph { cycle: Vec<String> },

    /// Project graph has a cycle and cannot be ordered
    #[error("Cyclic project dependency found: {}", cycle.join(" -> "))]
    CyclicProjectGraph { cycle: Vec<String> },

    /// Index lookup failed
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Name filter errors
#[derive(Error, Debug)]
pub enum FilterError {
    /// Regex could not be compiled
    #[error("Invalid assembly name pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },
}

/// Component propagation errors
#[derive(Error, Debug)]
pub enum PropagationError {
    /// Index lookup failed
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Project outputs could not be listed
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Copying a component failed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// Reading a built binary's references failed
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Binary metadata errors
#[derive(Error, Debug)]
pub enum MetadataError {
    /// IO error reading the binary
    #[error("Failed to read binary '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// Missing MZ/PE signatures
    #[error("'{path}' is not a portable executable image")]
    NotPortableExecutable { path: PathBuf },

    /// PE image without a CLI header
    #[error("'{path}' is not a managed assembly (no CLI header)")]
    NotManaged { path: PathBuf },

    /// A structure points past the end of the file
    #[error("'{path}' is truncated: {what} is out of bounds")]
    Truncated { path: PathBuf, what: &'static str },

    /// Metadata root or streams are malformed
    #[error("'{path}' has malformed metadata: {error}")]
    BadMetadata { path: PathBuf, error: String },
}

/// External process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Process could not be started
    #[error("Failed to run '{program}': {error}")]
    Spawn { program: PathBuf, error: String },

    /// Process ended with a non-zero exit code
    #[error("{message} (exit code {code:?})")]
    FailedExitCode { message: String, code: Option<i32> },
}

/// Build orchestration errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build tool failed for a solution
    #[error("Build failed: {solution}")]
    BuildFailed {
        solution: PathBuf,
        #[source]
        source: ProcessError,
    },

    /// Test runner failed and failures are not ignored
    #[error("Tests failed: project {project}, output {output}")]
    TestsFailed {
        project: String,
        output: PathBuf,
        #[source]
        source: ProcessError,
    },

    /// Configured tool cannot be found
    #[error("Tool not found: '{tool}'")]
    ToolNotFound { tool: String },

    /// Component propagation failed
    #[error(transparent)]
    Propagation(#[from] PropagationError),

    /// Ordering failed
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Project outputs could not be listed
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Index lookup failed
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' -> '{to}': {error}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Settings file errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read settings file
    #[error("Failed to read config file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse settings file
    #[error("Failed to parse config file '{path}': {error}")]
    Parse { path: PathBuf, error: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}
