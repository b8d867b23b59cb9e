//! Project index
//!
//! Scans a directory tree once for project and solution files and answers the lookups
//! that dependency resolution and propagation need: projects by assembly name, the
//! solution that owns a project, and the projects of a solution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::defaults::{PROJECT_EXTENSION, SOLUTION_EXTENSION};
use crate::core::parser::{MsBuildProjectParser, ProjectParser};
use crate::core::project::{AssemblyReference, Project, ProjectId, ProjectRegistry};
use crate::core::solution::{SlnReader, SolutionReader};
use crate::error::{IndexError, ProjectError};
use crate::infra::filesystem::{canonical_path, has_extension, is_within, path_key, resolve_relative};

/// What to do when two projects build an assembly with the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameCollisionPolicy {
    /// Log every collision and continue
    #[default]
    Warn,
    /// Refuse to build the index
    Fail,
}

/// Index construction options
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub name_collisions: NameCollisionPolicy,
}

/// Projects and solutions found under a root directory
#[derive(Debug)]
pub struct ProjectIndex {
    root: PathBuf,
    registry: ProjectRegistry,
    by_name: HashMap<String, Vec<ProjectId>>,
    solutions: Vec<PathBuf>,
    solution_projects: HashMap<String, Vec<ProjectId>>,
    owning_solution: HashMap<ProjectId, PathBuf>,
}

impl ProjectIndex {
    /// Scan `root` with the MSBuild project parser and the `.sln` reader
    pub fn build(root: &Path, options: &IndexOptions) -> Result<Self, IndexError> {
        Self::build_with(root, options, &MsBuildProjectParser::new(), &SlnReader::new())
    }

    /// Scan `root` with the given collaborators
    pub fn build_with(
        root: &Path,
        options: &IndexOptions,
        parser: &dyn ProjectParser,
        reader: &dyn SolutionReader,
    ) -> Result<Self, IndexError> {
        if !root.is_dir() {
            return Err(IndexError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        let root = canonical_path(root).map_err(|e| IndexError::Walk {
            path: root.to_path_buf(),
            error: e.to_string(),
        })?;

        let (project_files, solution_files) = scan(&root)?;
        tracing::info!(
            "Found {} project(s) and {} solution(s) under {}",
            project_files.len(),
            solution_files.len(),
            root.display()
        );

        let mut registry = ProjectRegistry::new();
        for file in &project_files {
            registry.load(file, parser)?;
        }

        let mut by_name: HashMap<String, Vec<ProjectId>> = HashMap::new();
        for project in registry.iter() {
            by_name
                .entry(project.name.to_lowercase())
                .or_default()
                .push(project.id);
        }
        check_name_collisions(&registry, &by_name, options.name_collisions)?;

        let mut index = Self {
            root,
            registry,
            by_name,
            solutions: Vec::with_capacity(solution_files.len()),
            solution_projects: HashMap::new(),
            owning_solution: HashMap::new(),
        };
        for solution in solution_files {
            index.map_solution(solution, reader)?;
        }
        Ok(index)
    }

    fn map_solution(&mut self, solution: PathBuf, reader: &dyn SolutionReader) -> Result<(), IndexError> {
        let directory = solution.parent().unwrap_or(Path::new("")).to_path_buf();
        let mut members = Vec::new();

        for relative in reader.project_paths(&solution)? {
            let resolved = resolve_relative(&directory, &relative.to_string_lossy());
            if !resolved.is_file() {
                tracing::warn!(
                    "Solution {} lists a project that does not exist: {}",
                    solution.display(),
                    resolved.display()
                );
                continue;
            }
            let resolved = canonical_path(&resolved).map_err(|e| ProjectError::Io {
                path: resolved.clone(),
                error: e.to_string(),
            })?;
            if !is_within(&directory, &resolved) {
                tracing::warn!(
                    "Ignoring project {} of solution {}: it is not under the solution directory",
                    resolved.display(),
                    solution.display()
                );
                continue;
            }
            let Some(id) = self.registry.find(&resolved) else {
                tracing::debug!("Solution member {} is not indexed", resolved.display());
                continue;
            };

            match self.owning_solution.get(&id) {
                Some(existing) if path_key(existing) != path_key(&solution) => {
                    return Err(IndexError::ProjectInMultipleSolutions {
                        project: resolved,
                        first: existing.clone(),
                        second: solution,
                    });
                }
                Some(_) => {}
                None => {
                    self.owning_solution.insert(id, solution.clone());
                    members.push(id);
                }
            }
        }

        tracing::debug!("Solution {} has {} project(s)", solution.display(), members.len());
        self.solution_projects.insert(path_key(&solution), members);
        self.solutions.push(solution);
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project(&self, id: ProjectId) -> &Project {
        self.registry.get(id)
    }

    pub fn project_by_path(&self, path: &Path) -> Option<ProjectId> {
        self.registry.find(path)
    }

    pub fn all_projects(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.registry.iter().map(|p| p.id)
    }

    /// Every indexed solution, sorted
    pub fn solutions(&self) -> &[PathBuf] {
        &self.solutions
    }

    /// Solutions that own at least one project
    pub fn solutions_with_projects(&self) -> Vec<PathBuf> {
        self.solutions
            .iter()
            .filter(|s| self.solution_projects.get(&path_key(s)).is_some_and(|p| !p.is_empty()))
            .cloned()
            .collect()
    }

    pub fn find_projects_for_assembly_name(&self, name: &str) -> &[ProjectId] {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// Projects whose name equals the reference's short name, ignoring case
    pub fn find_projects_for_assembly_reference(&self, reference: &AssemblyReference) -> &[ProjectId] {
        self.find_projects_for_assembly_name(reference.short_name())
    }

    /// The only project building `reference`, if exactly one does
    pub fn find_single_project(&self, reference: &AssemblyReference) -> Option<ProjectId> {
        match self.find_projects_for_assembly_reference(reference) {
            [single] => Some(*single),
            _ => None,
        }
    }

    pub fn owning_solution(&self, id: ProjectId) -> Result<&Path, IndexError> {
        self.owning_solution
            .get(&id)
            .map(PathBuf::as_path)
            .ok_or_else(|| IndexError::NoOwningSolution {
                project: self.project(id).path.clone(),
            })
    }

    pub fn has_owning_solution(&self, id: ProjectId) -> bool {
        self.owning_solution.contains_key(&id)
    }

    pub fn projects_of_solution(&self, solution: &Path) -> Result<&[ProjectId], IndexError> {
        self.solution_projects
            .get(&path_key(solution))
            .map(Vec::as_slice)
            .ok_or_else(|| IndexError::UnknownSolution {
                path: solution.to_path_buf(),
            })
    }

    /// Projects declaring a reference equal to `reference`
    pub fn projects_using_reference(&self, reference: &AssemblyReference) -> Vec<ProjectId> {
        self.registry
            .iter()
            .filter(|p| p.assembly_references.iter().any(|r| r == reference))
            .map(|p| p.id)
            .collect()
    }

    pub fn absolute_output_path(&self, id: ProjectId) -> Result<PathBuf, ProjectError> {
        self.project(id).absolute_output_path()
    }

    pub fn built_outputs(&self, id: ProjectId) -> Result<Vec<PathBuf>, ProjectError> {
        self.registry.built_outputs(id)
    }
}

fn scan(root: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), IndexError> {
    let mut projects = Vec::new();
    let mut solutions = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| IndexError::Walk {
            path: e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf),
            error: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if has_extension(&path, PROJECT_EXTENSION) {
            projects.push(path);
        } else if has_extension(&path, SOLUTION_EXTENSION) {
            solutions.push(path);
        }
    }

    projects.sort();
    solutions.sort();
    Ok((projects, solutions))
}

fn check_name_collisions(
    registry: &ProjectRegistry,
    by_name: &HashMap<String, Vec<ProjectId>>,
    policy: NameCollisionPolicy,
) -> Result<(), IndexError> {
    let mut collisions: Vec<(&String, &Vec<ProjectId>)> =
        by_name.iter().filter(|(_, ids)| ids.len() > 1).collect();
    collisions.sort();

    for (name, ids) in collisions {
        let projects: Vec<PathBuf> = ids.iter().map(|&id| registry.get(id).path.clone()).collect();
        match policy {
            NameCollisionPolicy::Fail => {
                return Err(IndexError::AmbiguousAssemblyName {
                    name: registry.get(ids[0]).name.clone(),
                    projects,
                });
            }
            NameCollisionPolicy::Warn => {
                tracing::warn!(
                    "Assembly name '{name}' is built by {} projects: {}",
                    projects.len(),
                    projects
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
    }
    Ok(())
}
