//! Default configuration values

/// Project file extension (no dot)
pub const PROJECT_EXTENSION: &str = "csproj";

/// Solution file extension (no dot)
pub const SOLUTION_EXTENSION: &str = "sln";

/// Build tool looked up on `PATH` when not configured
pub const DEFAULT_MSBUILD: &str = "msbuild";

/// Test runner looked up on `PATH` when not configured
pub const DEFAULT_TEST_RUNNER: &str = "mstest";

/// NuGet client used to look up package versions
pub const DEFAULT_NUGET: &str = "nuget";

/// Projects referencing an assembly with this name prefix contain tests
pub const DEFAULT_TEST_FRAMEWORK_PREFIX: &str = "Microsoft.VisualStudio.QualityTools.UnitTestFramework";

/// Per-tree settings file looked up in the base path
pub const SETTINGS_FILE: &str = "slnresolve.toml";

/// Unbounded traversal depth
pub const DEFAULT_RECURSION_LEVEL: i32 = -1;

/// Directory next to a solution receiving its dependencies in generated MSBuild drivers
pub const COMPONENTS_DIR: &str = "Components";

/// Driver file written by `export msbuild`
pub const MSBUILD_DRIVER_FILE: &str = "build.proj";

/// File written next to each project by `export packages-config`
pub const PACKAGES_CONFIG_FILE: &str = "packages.config";

/// Version written when `nuget list` does not know a package
pub const UNKNOWN_PACKAGE_VERSION: &str = "unknown";

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
