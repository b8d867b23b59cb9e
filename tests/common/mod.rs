//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests: a temporary source tree
//! with helpers that write `.csproj` and `.sln` files and fake build outputs.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use slnresolve::core::index::{IndexOptions, ProjectIndex};

/// Test project context
///
/// Creates a temporary directory for a source tree and provides utilities for setting up
/// test scenarios.
pub struct TestProject {
    /// Temporary directory for the source tree
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new source tree in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Canonical path of the source tree root
    pub fn path(&self) -> PathBuf {
        self.dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp directory")
    }

    /// Canonical path of a file in the source tree
    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Create a file in the source tree
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the source tree
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the source tree
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the source tree
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Write a project file
    pub fn add_project(&self, path: &str, project: &ProjectSpec) {
        self.create_file(path, &project.to_xml());
    }

    /// Write a solution listing `projects` (paths relative to the solution directory)
    pub fn add_solution(&self, path: &str, projects: &[&str]) {
        self.create_file(path, &solution_text(projects));
    }

    /// Create files in `<project dir>/bin/Debug`
    pub fn add_outputs(&self, project_dir: &str, files: &[&str]) {
        for file in files {
            self.create_file(&format!("{project_dir}/bin/Debug/{file}"), &format!("built {file}"));
        }
    }

    /// Index the source tree with default options
    pub fn index(&self) -> ProjectIndex {
        ProjectIndex::build(&self.path(), &IndexOptions::default()).expect("Failed to index source tree")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `.csproj` content with a single `Debug|AnyCPU` configuration
#[derive(Debug, Clone, Default)]
pub struct ProjectSpec {
    pub assembly_name: String,
    pub output_type: Option<String>,
    /// `ProjectReference` includes, relative to the project directory
    pub project_references: Vec<String>,
    /// `(Include, HintPath)` pairs
    pub references: Vec<(String, Option<String>)>,
}

impl ProjectSpec {
    pub fn library(name: &str) -> Self {
        Self {
            assembly_name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn executable(name: &str) -> Self {
        Self {
            assembly_name: name.to_string(),
            output_type: Some("Exe".to_string()),
            ..Self::default()
        }
    }

    pub fn project_reference(mut self, include: &str) -> Self {
        self.project_references.push(include.to_string());
        self
    }

    pub fn reference(mut self, include: &str, hint_path: Option<&str>) -> Self {
        self.references
            .push((include.to_string(), hint_path.map(ToString::to_string)));
        self
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <Project ToolsVersion=\"4.0\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\n\
             \x20 <PropertyGroup>\n\
             \x20   <Configuration Condition=\" '$(Configuration)' == '' \">Debug</Configuration>\n\
             \x20   <Platform Condition=\" '$(Platform)' == '' \">AnyCPU</Platform>\n",
        );
        if let Some(output_type) = &self.output_type {
            let _ = writeln!(xml, "    <OutputType>{output_type}</OutputType>");
        }
        let _ = writeln!(xml, "    <AssemblyName>{}</AssemblyName>", self.assembly_name);
        xml.push_str(
            "  </PropertyGroup>\n\
             \x20 <PropertyGroup Condition=\" '$(Configuration)|$(Platform)' == 'Debug|AnyCPU' \">\n\
             \x20   <OutputPath>bin\\Debug\\</OutputPath>\n\
             \x20 </PropertyGroup>\n\
             \x20 <ItemGroup>\n",
        );
        for (include, hint_path) in &self.references {
            match hint_path {
                Some(hint_path) => {
                    let _ = writeln!(
                        xml,
                        "    <Reference Include=\"{include}\">\n      <HintPath>{hint_path}</HintPath>\n    </Reference>"
                    );
                }
                None => {
                    let _ = writeln!(xml, "    <Reference Include=\"{include}\" />");
                }
            }
        }
        xml.push_str("  </ItemGroup>\n  <ItemGroup>\n");
        for include in &self.project_references {
            let _ = writeln!(xml, "    <ProjectReference Include=\"{include}\" />");
        }
        xml.push_str("  </ItemGroup>\n</Project>\n");
        xml
    }
}

/// `.sln` text listing `projects`
pub fn solution_text(projects: &[&str]) -> String {
    let mut sln = String::from(
        "\nMicrosoft Visual Studio Solution File, Format Version 11.00\n# Visual Studio 2010\n",
    );
    for (i, project) in projects.iter().enumerate() {
        let name = Path::new(&project.replace('\\', "/"))
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(
            sln,
            "Project(\"{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}\") = \"{name}\", \"{project}\", \"{{00000000-0000-0000-0000-{i:012}}}\"\nEndProject"
        );
    }
    sln.push_str("Global\nEndGlobal\n");
    sln
}
