//! Descriptor generation
//!
//! Renders MSBuild driver projects that build solutions in dependency order, NuGet
//! `.nuspec` files describing each project's dependencies, and `packages.config` files
//! whose versions come from `nuget list`. `write_all` puts the generated files on disk.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use quick_xml::escape::escape;

use crate::config::defaults::{
    COMPONENTS_DIR, MSBUILD_DRIVER_FILE, PACKAGES_CONFIG_FILE, UNKNOWN_PACKAGE_VERSION,
};
use crate::core::graph::DependencyGraph;
use crate::core::index::ProjectIndex;
use crate::core::project::ProjectId;
use crate::core::resolver::{build_order, DependencyInfo};
use crate::error::{FilesystemError, ProcessError, ResolverError};
use crate::infra::filesystem::write_file;
use crate::infra::process::ProcessRunner;

const MSBUILD_NAMESPACE: &str = "http://schemas.microsoft.com/developer/msbuild/2003";

/// A rendered file and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
}

/// MSBuild driver projects for the solutions of `info`
///
/// Targets follow the build order of the trimmed graph. Excluded solutions are treated
/// as already built. Each target depends on the targets of its dependency solutions,
/// copies their outputs into `Components\<dependency>` next to its solution, then
/// builds its solution. Without `split` everything goes into one `build.proj` in
/// `output_dir` with an extra `All` target. With `split` each solution gets its own
/// `build.proj` next to it, importing the files of its dependencies.
pub fn msbuild_driver(
    info: &DependencyInfo,
    output_dir: &Path,
    split: bool,
) -> Result<Vec<GeneratedFile>, ResolverError> {
    let graph = &info.trimmed_solution_graph;
    let order = build_order(graph)?;

    if split {
        return Ok(order
            .iter()
            .map(|solution| {
                let mut content = project_prefix(&[target_name(solution)]);
                for dependency in graph.in_edges(solution) {
                    let _ = writeln!(
                        content,
                        "\t<Import Project=\"{}\"/>",
                        escape(driver_path(dependency).display().to_string().as_str())
                    );
                }
                content.push_str(&render_target(graph, solution));
                content.push_str("</Project>\n");
                GeneratedFile {
                    path: driver_path(solution),
                    content,
                }
            })
            .collect());
    }

    let mut content = project_prefix(&[]);
    for solution in &order {
        content.push_str(&render_target(graph, solution));
    }
    let all: Vec<String> = order.iter().map(|s| target_name(s)).collect();
    let _ = writeln!(
        content,
        "\t<Target Name=\"All\" DependsOnTargets=\"{}\"></Target>",
        all.join(";")
    );
    content.push_str("</Project>\n");

    Ok(vec![GeneratedFile {
        path: output_dir.join(MSBUILD_DRIVER_FILE),
        content,
    }])
}

/// One `<project>.nuspec` next to each project of the project graph
///
/// Dependencies are the project's direct dependencies in the graph, unless `no_deps`.
pub fn nuspec(index: &ProjectIndex, graph: &DependencyGraph<ProjectId>, no_deps: bool) -> Vec<GeneratedFile> {
    graph
        .vertices()
        .map(|&id| {
            let project = index.project(id);
            let mut dependencies = String::new();
            if !no_deps {
                for &dependency in graph.in_edges(&id) {
                    let _ = writeln!(
                        dependencies,
                        "      <dependency id=\"{}\" version=\"\" />",
                        escape(index.project(dependency).name.as_str())
                    );
                }
            }

            let name = escape(project.name.as_str());
            let content = format!(
                "<?xml version=\"1.0\"?>\n\
                 <package>\n\
                 \x20 <metadata>\n\
                 \x20   <id>{name}</id>\n\
                 \x20   <version>$version$</version>\n\
                 \x20   <title>{name}</title>\n\
                 \x20   <authors>Unknown</authors>\n\
                 \x20   <description>Built from {}</description>\n\
                 \x20   <dependencies>\n\
                 {dependencies}\
                 \x20   </dependencies>\n\
                 \x20 </metadata>\n\
                 </package>\n",
                escape(project.path.display().to_string().as_str())
            );
            GeneratedFile {
                path: project.path.with_extension("nuspec"),
                content,
            }
        })
        .collect()
}

/// One `packages.config` next to each project of the project graph
///
/// Lists the project's graph dependencies that are not project references. Each package
/// version is the first `nuget list <id>` line naming that id, or `unknown`; lookups are
/// made once per id.
pub fn packages_config(
    index: &ProjectIndex,
    graph: &DependencyGraph<ProjectId>,
    runner: &dyn ProcessRunner,
    nuget: &Path,
) -> Result<Vec<GeneratedFile>, ProcessError> {
    let mut versions: HashMap<String, String> = HashMap::new();
    let mut files = Vec::with_capacity(graph.vertex_count());

    for &id in graph.vertices() {
        let project = index.project(id);
        let mut packages = String::new();
        for &dependency in graph.in_edges(&id) {
            if project.project_references.contains(&dependency) {
                continue;
            }
            let name = &index.project(dependency).name;
            let version = match versions.get(name) {
                Some(version) => version.clone(),
                None => {
                    let version = package_version(runner, nuget, name)?;
                    tracing::debug!("{name} = {version}");
                    versions.insert(name.clone(), version.clone());
                    version
                }
            };
            let _ = writeln!(
                packages,
                "    <package id=\"{}\" version=\"{}\" />",
                escape(name.as_str()),
                escape(version.as_str())
            );
        }

        files.push(GeneratedFile {
            path: project.directory().join(PACKAGES_CONFIG_FILE),
            content: format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<packages>\n{packages}</packages>\n"),
        });
    }
    Ok(files)
}

/// Version from the first `<id> <version>` line of `nuget list <id>` naming `name`
fn package_version(runner: &dyn ProcessRunner, nuget: &Path, name: &str) -> Result<String, ProcessError> {
    let output = runner.run(nuget, &["list".to_string(), name.to_string()])?;
    Ok(output
        .stdout
        .lines()
        .find_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(id), Some(version)) if id.eq_ignore_ascii_case(name) => Some(version.to_string()),
                _ => None,
            }
        })
        .unwrap_or_else(|| UNKNOWN_PACKAGE_VERSION.to_string()))
}

/// Write every generated file, creating parent directories
pub fn write_all(files: &[GeneratedFile]) -> Result<(), FilesystemError> {
    for file in files {
        tracing::info!("Generating file: {}", file.path.display());
        write_file(&file.path, &file.content)?;
    }
    Ok(())
}

fn project_prefix(default_targets: &[String]) -> String {
    format!(
        "<Project DefaultTargets=\"{}\" xmlns=\"{MSBUILD_NAMESPACE}\">\n",
        default_targets.join(";")
    )
}

fn render_target(graph: &DependencyGraph<PathBuf>, solution: &Path) -> String {
    let solution = solution.to_path_buf();
    let name = target_name(&solution);
    let dependencies: Vec<&PathBuf> = graph.in_edges(&solution).collect();
    let solution_dir = solution.parent().unwrap_or(Path::new(""));

    let mut target = String::new();
    let _ = writeln!(target, "\n\t<!-- {} -->", escape(solution.display().to_string().as_str()));
    let _ = writeln!(
        target,
        "\t<Target Name=\"{name}\" DependsOnTargets=\"{}\">",
        dependencies.iter().map(|d| target_name(d)).collect::<Vec<_>>().join(";")
    );
    for dependency in &dependencies {
        let destination = solution_dir.join(COMPONENTS_DIR).join(file_stem(dependency));
        let _ = writeln!(
            target,
            "\t\t<Copy SourceFiles=\"@({}_Outputs)\" DestinationFolder=\"{}\" SkipUnchangedFiles=\"True\"/>",
            target_name(dependency),
            escape(destination.display().to_string().as_str())
        );
    }
    let _ = writeln!(
        target,
        "\t\t<MSBuild Projects=\"{}\" ToolsVersion=\"4.0\">",
        escape(solution.display().to_string().as_str())
    );
    let _ = writeln!(target, "\t\t\t<Output ItemName=\"{name}_Outputs\" TaskParameter=\"TargetOutputs\"/>");
    target.push_str("\t\t</MSBuild>\n");
    target.push_str("\t</Target>\n");
    target
}

/// MSBuild target names cannot contain dots
fn target_name(solution: &Path) -> String {
    file_stem(solution).replace(['.', ' ', '-'], "_")
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned())
}

fn driver_path(solution: &Path) -> PathBuf {
    solution
        .parent()
        .unwrap_or(Path::new(""))
        .join(MSBUILD_DRIVER_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::process::ProcessOutput;

    fn info(edges: &[(&str, &str)], excluded: &[&str]) -> DependencyInfo {
        let mut graph = DependencyGraph::new();
        for (from, to) in edges {
            graph.add_edge(PathBuf::from(from), PathBuf::from(to));
        }
        let mut trimmed = graph.clone();
        trimmed.remove_vertices_where(|v| excluded.iter().any(|e| v == Path::new(e)));
        DependencyInfo {
            seeds: Vec::new(),
            project_graph: DependencyGraph::new(),
            solution_graph: graph,
            trimmed_solution_graph: trimmed,
        }
    }

    struct NugetList(&'static str);

    impl ProcessRunner for NugetList {
        fn run(&self, _program: &Path, _args: &[String]) -> Result<ProcessOutput, ProcessError> {
            Ok(ProcessOutput {
                stdout: self.0.to_string(),
                stderr: String::new(),
                status_code: Some(0),
            })
        }
    }

    #[test]
    fn test_package_version_matches_id_ignoring_case() {
        let runner = NugetList("Lib.Extras 2.0.0\nlib 1.4.2\n");
        let version = package_version(&runner, Path::new("nuget"), "Lib").unwrap();
        assert_eq!(version, "1.4.2");
    }

    #[test]
    fn test_package_version_unknown() {
        let runner = NugetList("No packages found.\n");
        let version = package_version(&runner, Path::new("nuget"), "Lib").unwrap();
        assert_eq!(version, UNKNOWN_PACKAGE_VERSION);
    }

    #[test]
    fn test_target_name() {
        assert_eq!(target_name(Path::new("/src/My.Core/My.Core.sln")), "My_Core");
    }

    #[test]
    fn test_single_driver_targets_follow_build_order() {
        let info = info(&[("/s/Core/Core.sln", "/s/App/App.sln")], &[]);
        let files = msbuild_driver(&info, Path::new("/out"), false).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("/out/build.proj"));
        let content = &files[0].content;
        let core = content.find("<Target Name=\"Core\"").unwrap();
        let app = content.find("<Target Name=\"App\" DependsOnTargets=\"Core\">").unwrap();
        assert!(core < app);
        assert!(content.contains("DestinationFolder=\"/s/App/Components/Core\""));
        assert!(content.contains("<Target Name=\"All\" DependsOnTargets=\"Core;App\"></Target>"));
        assert!(content.ends_with("</Project>\n"));
    }

    #[test]
    fn test_split_driver_imports_dependencies() {
        let info = info(&[("/s/Core/Core.sln", "/s/App/App.sln")], &[]);
        let files = msbuild_driver(&info, Path::new("/out"), true).unwrap();

        assert_eq!(files.len(), 2);
        let app = files
            .iter()
            .find(|f| f.path == PathBuf::from("/s/App/build.proj"))
            .unwrap();
        assert!(app.content.contains("<Import Project=\"/s/Core/build.proj\"/>"));
        assert!(app.content.starts_with("<Project DefaultTargets=\"App\""));
    }

    #[test]
    fn test_excluded_solution_has_no_target() {
        let info = info(&[("/s/Core/Core.sln", "/s/App/App.sln")], &["/s/Core/Core.sln"]);
        let files = msbuild_driver(&info, Path::new("/out"), false).unwrap();
        let content = &files[0].content;
        assert!(!content.contains("Core"));
        assert!(content.contains("<Target Name=\"App\" DependsOnTargets=\"\">"));
    }

    #[test]
    fn test_cycle_is_reported() {
        let info = info(&[("/a.sln", "/b.sln"), ("/b.sln", "/a.sln")], &[]);
        let err = msbuild_driver(&info, Path::new("/out"), false).unwrap_err();
        assert!(matches!(err, ResolverError::CyclicSolutionGraph { .. }));
    }
}
