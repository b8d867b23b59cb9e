//! Project data model
//!
//! A project is identified by its canonical path. All projects of a run live in a
//! [`ProjectRegistry`] arena and are referred to by [`ProjectId`] handles.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::core::parser::{ParsedProject, ProjectParser};
use crate::error::ProjectError;
use crate::infra::filesystem::{canonical_path, path_key, resolve_relative};

/// Handle of a project in a [`ProjectRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(usize);

impl ProjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Reference to a compiled assembly
#[derive(Debug, Clone)]
pub struct AssemblyReference {
    /// Declared name, possibly a full identity (`Name, Version=.., Culture=..`)
    pub name: String,
    /// Hint path resolved against the referencing project's directory
    pub hint_path: Option<PathBuf>,
    /// Hint path as written in the project file
    pub explicit_hint_path: Option<String>,
}

impl AssemblyReference {
    pub fn new(
        name: impl Into<String>,
        hint_path: Option<PathBuf>,
        explicit_hint_path: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            hint_path,
            explicit_hint_path,
        }
    }

    /// Text before the first comma of the declared name
    pub fn short_name(&self) -> &str {
        short_assembly_name(&self.name)
    }

    /// Lowercase short name, used for all name lookups
    pub fn name_key(&self) -> String {
        self.short_name().to_lowercase()
    }

    fn hint_key(&self) -> Option<String> {
        self.hint_path.as_deref().map(path_key)
    }
}

impl PartialEq for AssemblyReference {
    fn eq(&self, other: &Self) -> bool {
        self.short_name() == other.short_name() && self.hint_key() == other.hint_key()
    }
}

impl Eq for AssemblyReference {}

impl Hash for AssemblyReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.short_name().hash(state);
        self.hint_key().hash(state);
    }
}

impl fmt::Display for AssemblyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hint_path {
            Some(hint) => write!(f, "{} ({})", self.short_name(), hint.display()),
            None => write!(f, "{}", self.short_name()),
        }
    }
}

/// Short name of an assembly identity string
pub fn short_assembly_name(name: &str) -> &str {
    name.split(',').next().unwrap_or(name).trim()
}

/// One `Configuration|Platform` pair declared by a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfiguration {
    pub configuration: String,
    pub platform: String,
    /// Relative to the project directory
    pub output_path: String,
}

impl ProjectConfiguration {
    /// Whether the labels match, ignoring case
    pub fn matches(&self, configuration: &str, platform: &str) -> bool {
        self.configuration.eq_ignore_ascii_case(configuration)
            && self.platform.eq_ignore_ascii_case(platform)
    }
}

/// What a project builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputKind {
    #[default]
    Library,
    Executable,
    Other,
}

impl OutputKind {
    /// Map an `OutputType` property value
    pub fn from_output_type(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Library,
            Some(v) if v.eq_ignore_ascii_case("library") => Self::Library,
            Some(v) if v.eq_ignore_ascii_case("exe") || v.eq_ignore_ascii_case("winexe") => {
                Self::Executable
            }
            Some(_) => Self::Other,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Executable => write!(f, "executable"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A loaded project
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    /// The `AssemblyName`
    pub name: String,
    /// Canonical absolute path of the project file
    pub path: PathBuf,
    pub project_references: Vec<ProjectId>,
    pub assembly_references: Vec<AssemblyReference>,
    pub configurations: Vec<ProjectConfiguration>,
    /// Index into `configurations`
    pub default_configuration: Option<usize>,
    pub output_kind: OutputKind,
    pub default_labels: (String, String),
}

impl Project {
    /// Directory containing the project file
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    pub fn default_configuration(&self) -> Option<&ProjectConfiguration> {
        self.default_configuration.and_then(|i| self.configurations.get(i))
    }

    /// Output directory of the default configuration
    pub fn absolute_output_path(&self) -> Result<PathBuf, ProjectError> {
        let configuration =
            self.default_configuration()
                .ok_or_else(|| ProjectError::NoDefaultConfiguration {
                    project: self.name.clone(),
                    configuration: self.default_labels.0.clone(),
                    platform: self.default_labels.1.clone(),
                })?;
        Ok(resolve_relative(self.directory(), &configuration.output_path))
    }

    /// Lowercase short names of every assembly this project references
    pub fn reference_name_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.assembly_references.iter().map(AssemblyReference::name_key)
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

/// Arena of loaded projects, one entry per canonical path
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: Vec<Project>,
    by_path: HashMap<String, ProjectId>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a project and, transitively, every project it references
    ///
    /// Loading a path that is already registered returns the existing handle. On error the
    /// registry is left unchanged.
    pub fn load(&mut self, path: &Path, parser: &dyn ProjectParser) -> Result<ProjectId, ProjectError> {
        let path = canonical_path(path).map_err(|e| ProjectError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        if let Some(id) = self.find(&path) {
            return Ok(id);
        }

        let mut parsed: Vec<ParsedProject> = Vec::new();
        let mut pending: HashSet<String> = HashSet::new();
        let mut queue = VecDeque::from([path.clone()]);
        pending.insert(path_key(&path));

        while let Some(next) = queue.pop_front() {
            tracing::debug!("Loading project {}", next.display());
            let project = parser.parse(&next)?;
            for referenced in &project.project_references {
                let key = path_key(referenced);
                if !self.by_path.contains_key(&key) && pending.insert(key) {
                    queue.push_back(referenced.clone());
                }
            }
            parsed.push(project);
        }

        let base = self.projects.len();
        for (offset, project) in parsed.iter().enumerate() {
            self.by_path.insert(path_key(&project.path), ProjectId(base + offset));
        }
        for (offset, project) in parsed.into_iter().enumerate() {
            let project_references = project
                .project_references
                .iter()
                .filter_map(|p| self.by_path.get(&path_key(p)).copied())
                .collect();
            self.projects.push(Project {
                id: ProjectId(base + offset),
                name: project.name,
                path: project.path,
                project_references,
                assembly_references: project.assembly_references,
                configurations: project.configurations,
                default_configuration: project.default_configuration,
                output_kind: project.output_kind,
                default_labels: project.default_labels,
            });
        }

        Ok(ProjectId(base))
    }

    pub fn get(&self, id: ProjectId) -> &Project {
        &self.projects[id.0]
    }

    /// Handle of an already loaded project
    pub fn find(&self, path: &Path) -> Option<ProjectId> {
        self.by_path.get(&path_key(path)).copied()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    /// Files a project's default configuration produced
    ///
    /// Keeps files named `<project name>.*` and drops those whose assembly stem is one of
    /// the project's own dependencies.
    pub fn built_outputs(&self, id: ProjectId) -> Result<Vec<PathBuf>, ProjectError> {
        let project = self.get(id);
        let output_dir = project.absolute_output_path()?;
        if !output_dir.is_dir() {
            return Err(ProjectError::OutputsUnavailable {
                project: project.name.clone(),
                path: output_dir,
            });
        }

        let prefix = format!("{}.", project.name.to_lowercase());
        let dependencies: HashSet<String> = project
            .reference_name_keys()
            .chain(
                project
                    .project_references
                    .iter()
                    .map(|&r| self.get(r).name.to_lowercase()),
            )
            .collect();

        let entries = std::fs::read_dir(&output_dir).map_err(|e| ProjectError::Io {
            path: output_dir.clone(),
            error: e.to_string(),
        })?;

        let mut outputs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ProjectError::Io {
                path: output_dir.clone(),
                error: e.to_string(),
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_lowercase();
            if !file_name.starts_with(&prefix) {
                continue;
            }
            if dependencies.contains(&assembly_stem(&file_name)) {
                continue;
            }
            outputs.push(path);
        }
        outputs.sort();
        Ok(outputs)
    }
}

/// `lib.util.dll` and `lib.util.dll.config` both give `lib.util`
fn assembly_stem(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map_or_else(|| file_name.to_string(), |s| s.to_string_lossy().into_owned());
    for binary in [".dll", ".exe"] {
        if let Some(inner) = stem.strip_suffix(binary) {
            return inner.to_string();
        }
    }
    stem
}
