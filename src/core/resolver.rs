//! Dependency resolution
//!
//! Walks project references and assembly references from a set of seed projects and
//! projects the result onto projects or solutions. Build order is the topological order
//! of the build-order oriented graph (edges point from dependency to dependent).

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::config::defaults::{PROJECT_EXTENSION, SOLUTION_EXTENSION};
use crate::core::graph::DependencyGraph;
use crate::core::index::ProjectIndex;
use crate::core::project::ProjectId;
use crate::error::{GraphError, IndexError, ResolverError};
use crate::infra::filesystem::{canonical_path, has_extension, path_key};

/// Graphs computed for one set of inputs
#[derive(Debug, Clone)]
pub struct DependencyInfo {
    /// Seed projects, in first-seen order
    pub seeds: Vec<ProjectId>,
    pub project_graph: DependencyGraph<ProjectId>,
    pub solution_graph: DependencyGraph<PathBuf>,
    /// `solution_graph` without the excluded solutions
    pub trimmed_solution_graph: DependencyGraph<PathBuf>,
}

/// Every `(dependent, dependency)` pair reachable from `seeds`
///
/// Breadth-first over project references and resolved assembly references. An edge is
/// reported each time it is reached, including when its target was already expanded.
/// Projects more than `max_level` steps from a seed are not expanded; a negative
/// `max_level` means no limit. With `include_solution_siblings`, every project of an
/// expanded project's solution is expanded too.
pub fn deep_dependencies(
    index: &ProjectIndex,
    seeds: &[ProjectId],
    include_solution_siblings: bool,
    max_level: i32,
) -> Result<Vec<(ProjectId, ProjectId)>, ResolverError> {
    let mut queue: VecDeque<(i32, ProjectId, ProjectId)> =
        seeds.iter().map(|&seed| (0, seed, seed)).collect();
    let mut visited: HashSet<ProjectId> = HashSet::new();
    let mut edges = Vec::new();

    while let Some((level, source, target)) = queue.pop_front() {
        if source != target {
            edges.push((source, target));
        }
        if max_level >= 0 && level > max_level {
            continue;
        }
        if !visited.insert(target) {
            continue;
        }

        let project = index.project(target);
        for &referenced in &project.project_references {
            queue.push_back((level + 1, target, referenced));
        }
        for reference in &project.assembly_references {
            for &builder in index.find_projects_for_assembly_reference(reference) {
                queue.push_back((level + 1, target, builder));
            }
        }

        if include_solution_siblings {
            let solution = index.owning_solution(target)?;
            for &sibling in index.projects_of_solution(solution)? {
                if sibling != target && !visited.contains(&sibling) {
                    queue.push_back((level + 1, sibling, sibling));
                }
            }
        }
    }

    Ok(edges)
}

/// Project graph of everything `seeds` depend on
///
/// With `reverse` the edges point from dependency to dependent.
pub fn project_dependency_graph(
    index: &ProjectIndex,
    seeds: &[ProjectId],
    reverse: bool,
    max_level: i32,
) -> Result<DependencyGraph<ProjectId>, ResolverError> {
    let mut graph = DependencyGraph::new();
    for &seed in seeds {
        graph.add_vertex(seed);
    }
    for (dependent, dependency) in deep_dependencies(index, seeds, false, max_level)? {
        if reverse {
            graph.add_edge(dependency, dependent);
        } else {
            graph.add_edge(dependent, dependency);
        }
    }
    Ok(graph)
}

/// Solution graph of everything `seeds` depend on, including their solutions' siblings
pub fn solution_dependency_graph(
    index: &ProjectIndex,
    seeds: &[ProjectId],
    reverse: bool,
    max_level: i32,
) -> Result<DependencyGraph<PathBuf>, ResolverError> {
    let mut graph = DependencyGraph::new();
    for &seed in seeds {
        graph.add_vertex(index.owning_solution(seed)?.to_path_buf());
    }
    for (dependent, dependency) in deep_dependencies(index, seeds, true, max_level)? {
        let dependent = index.owning_solution(dependent)?;
        let dependency = index.owning_solution(dependency)?;
        if path_key(dependent) == path_key(dependency) {
            continue;
        }
        let (from, to) = if reverse {
            (dependency, dependent)
        } else {
            (dependent, dependency)
        };
        graph.add_edge(from.to_path_buf(), to.to_path_buf());
    }
    Ok(graph)
}

/// Build-order graphs for the given `.csproj`/`.sln` inputs
pub fn get_dependency_info(
    index: &ProjectIndex,
    inputs: &[PathBuf],
    excluded_solutions: &[PathBuf],
    max_level: i32,
) -> Result<DependencyInfo, ResolverError> {
    let (projects, solutions) = partition_inputs(inputs)?;

    let mut excluded = HashSet::new();
    for path in excluded_solutions {
        let path = canonicalize(path)?;
        if !has_extension(&path, SOLUTION_EXTENSION) {
            return Err(ResolverError::InvalidExclusion { path });
        }
        excluded.insert(path_key(&path));
    }

    let mut seeds: Vec<ProjectId> = Vec::new();
    let mut seen = HashSet::new();
    for project in &projects {
        let id = index
            .project_by_path(project)
            .ok_or_else(|| IndexError::UnknownProject {
                path: project.clone(),
            })?;
        if seen.insert(id) {
            seeds.push(id);
        }
    }
    for solution in &solutions {
        for &id in index.projects_of_solution(solution)? {
            if seen.insert(id) {
                seeds.push(id);
            }
        }
    }
    tracing::debug!(
        "Resolving {} seed project(s) from {} input(s)",
        seeds.len(),
        inputs.len()
    );

    let project_graph = project_dependency_graph(index, &seeds, true, max_level)?;
    let solution_graph = solution_dependency_graph(index, &seeds, true, max_level)?;
    let mut trimmed_solution_graph = solution_graph.clone();
    trimmed_solution_graph.remove_vertices_where(|s| excluded.contains(&path_key(s)));

    Ok(DependencyInfo {
        seeds,
        project_graph,
        solution_graph,
        trimmed_solution_graph,
    })
}

/// Solutions in build order
pub fn build_order(graph: &DependencyGraph<PathBuf>) -> Result<Vec<PathBuf>, ResolverError> {
    graph
        .topological_sort()
        .map_err(|GraphError::NotAcyclic { cycle }| ResolverError::CyclicSolutionGraph { cycle })
}

/// Projects in build order
pub fn project_build_order(
    index: &ProjectIndex,
    graph: &DependencyGraph<ProjectId>,
) -> Result<Vec<ProjectId>, ResolverError> {
    let by_path = graph.map_vertices(|&id| index.project(id).path.clone());
    let order = by_path
        .topological_sort()
        .map_err(|GraphError::NotAcyclic { cycle }| ResolverError::CyclicProjectGraph { cycle })?;
    Ok(order
        .iter()
        .filter_map(|path| index.project_by_path(path))
        .collect())
}

fn canonicalize(path: &Path) -> Result<PathBuf, ResolverError> {
    canonical_path(path).map_err(|e| {
        ResolverError::Index(IndexError::Walk {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    })
}

fn partition_inputs(inputs: &[PathBuf]) -> Result<(Vec<PathBuf>, Vec<PathBuf>), ResolverError> {
    let mut projects = Vec::new();
    let mut solutions = Vec::new();
    let mut unknown: Vec<PathBuf> = Vec::new();

    for input in inputs {
        let path = canonicalize(input)?;
        if has_extension(&path, PROJECT_EXTENSION) {
            projects.push(path);
        } else if has_extension(&path, SOLUTION_EXTENSION) {
            solutions.push(path);
        } else {
            unknown.push(path);
        }
    }

    if let Some(first) = unknown.first() {
        let extension = extension_of(first);
        let files = unknown
            .iter()
            .filter(|p| extension_of(p) == extension)
            .cloned()
            .collect();
        return Err(ResolverError::UnknownFileKind { extension, files });
    }
    Ok((projects, solutions))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_inputs_grouped_by_extension() {
        let inputs = vec![
            PathBuf::from("/work/a.txt"),
            PathBuf::from("/work/A.sln"),
            PathBuf::from("/work/b.TXT"),
            PathBuf::from("/work/c.proj"),
        ];
        match partition_inputs(&inputs).unwrap_err() {
            ResolverError::UnknownFileKind { extension, files } => {
                assert_eq!(extension, ".txt");
                assert_eq!(files.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_partition_inputs() {
        let inputs = vec![PathBuf::from("/work/App/App.CSPROJ"), PathBuf::from("/work/All.sln")];
        let (projects, solutions) = partition_inputs(&inputs).unwrap();
        assert_eq!(projects, vec![PathBuf::from("/work/App/App.CSPROJ")]);
        assert_eq!(solutions, vec![PathBuf::from("/work/All.sln")]);
    }

    #[test]
    fn test_build_order_cycle_error_names_solutions() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(PathBuf::from("/w/A.sln"), PathBuf::from("/w/B.sln"));
        graph.add_edge(PathBuf::from("/w/B.sln"), PathBuf::from("/w/A.sln"));
        let err = build_order(&graph).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/w/A.sln"));
        assert!(message.contains("--exclude"));
    }
}
