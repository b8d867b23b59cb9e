//! MSBuild project file parsing
//!
//! Reads the handful of properties and items dependency resolution needs from a `.csproj`.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use crate::core::project::{AssemblyReference, OutputKind, ProjectConfiguration};
use crate::error::ProjectError;
use crate::infra::filesystem::{canonical_path, resolve_relative};

/// Result of parsing one project file
#[derive(Debug, Clone, Default)]
pub struct ParsedProject {
    pub name: String,
    /// Canonical path of the parsed file
    pub path: PathBuf,
    /// Canonical paths of referenced project files
    pub project_references: Vec<PathBuf>,
    pub assembly_references: Vec<AssemblyReference>,
    pub configurations: Vec<ProjectConfiguration>,
    /// Index into `configurations`
    pub default_configuration: Option<usize>,
    pub output_kind: OutputKind,
    /// Declared default `(Configuration, Platform)`
    pub default_labels: (String, String),
}

/// Parses project files
pub trait ProjectParser {
    fn parse(&self, path: &Path) -> Result<ParsedProject, ProjectError>;
}

/// Parser for MSBuild XML project files
#[derive(Debug)]
pub struct MsBuildProjectParser {
    condition: Option<Regex>,
}

impl Default for MsBuildProjectParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MsBuildProjectParser {
    pub fn new() -> Self {
        Self {
            condition: Regex::new(
                r"'\$\(Configuration\)\|\$\(Platform\)'\s*==\s*'([^|']*)\|([^']*)'",
            )
            .ok(),
        }
    }

    /// Parse project XML already read from `path`
    pub fn parse_str(&self, path: &Path, content: &str) -> Result<ParsedProject, ProjectError> {
        let directory = path.parent().unwrap_or(Path::new(""));
        let xml_error = |error: String| ProjectError::Xml {
            path: path.to_path_buf(),
            error,
        };

        let mut reader = Reader::from_str(content);
        let mut buf = Vec::new();
        let mut state = ParseState::default();

        loop {
            match reader.read_event_into(&mut buf).map_err(|e| xml_error(e.to_string()))? {
                Event::Start(ref e) => {
                    let name = local_name(e);
                    state.open(&name, e, false);
                    state.stack.push(name);
                }
                Event::Empty(ref e) => {
                    let name = local_name(e);
                    state.open(&name, e, true);
                }
                Event::Text(ref e) => {
                    if let Some(text) = state.text.as_mut() {
                        text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Event::CData(ref e) => {
                    if let Some(text) = state.text.as_mut() {
                        text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Event::GeneralRef(ref e) => {
                    if let Some(text) = state.text.as_mut() {
                        text.push_str(&resolve_entity(&String::from_utf8_lossy(e)));
                    }
                }
                Event::End(_) => {
                    if let Some(name) = state.stack.pop() {
                        state.close(&name, path);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        self.finish(path, directory, state)
    }

    fn finish(
        &self,
        path: &Path,
        directory: &Path,
        state: ParseState,
    ) -> Result<ParsedProject, ProjectError> {
        let name = state
            .assembly_name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ProjectError::MissingAssemblyName {
                path: path.to_path_buf(),
            })?;

        let mut assembly_references = Vec::with_capacity(state.references.len());
        for reference in state.references {
            if reference.hint_paths.len() > 1 {
                return Err(ProjectError::MultipleHintPaths {
                    assembly: reference.include,
                    hint_path: reference.hint_paths.join("', '"),
                    project: path.to_path_buf(),
                });
            }
            let explicit = reference.hint_paths.into_iter().next().map(|h| decode_path(&h));
            let hint_path = explicit.as_deref().map(|h| resolve_relative(directory, h));
            assembly_references.push(AssemblyReference::new(reference.include, hint_path, explicit));
        }

        let mut project_references = Vec::with_capacity(state.project_references.len());
        for include in state.project_references {
            let referenced = resolve_relative(directory, &decode_path(&include));
            if !referenced.is_file() {
                return Err(ProjectError::ReferencedProjectMissing {
                    project: path.to_path_buf(),
                    referenced,
                });
            }
            let referenced = canonical_path(&referenced).map_err(|e| ProjectError::Io {
                path: referenced.clone(),
                error: e.to_string(),
            })?;
            project_references.push(referenced);
        }

        let mut configurations = Vec::new();
        for group in state.configuration_groups {
            let Some(captures) = self
                .condition
                .as_ref()
                .and_then(|re| re.captures(&group.condition))
            else {
                continue;
            };
            let Some(output_path) = group.output_path.or_else(|| state.global_output_path.clone()) else {
                tracing::debug!(
                    "Configuration '{}' of {} has no OutputPath",
                    group.condition.trim(),
                    path.display()
                );
                continue;
            };
            configurations.push(ProjectConfiguration {
                configuration: captures[1].trim().to_string(),
                platform: captures[2].trim().to_string(),
                output_path,
            });
        }

        let default_labels = (
            state.default_configuration.unwrap_or_default(),
            state.default_platform.unwrap_or_default(),
        );
        let default_configuration = configurations
            .iter()
            .position(|c| c.matches(&default_labels.0, &default_labels.1));

        Ok(ParsedProject {
            name,
            path: path.to_path_buf(),
            project_references,
            assembly_references,
            configurations,
            default_configuration,
            output_kind: OutputKind::from_output_type(state.output_type.as_deref()),
            default_labels,
        })
    }
}

impl ProjectParser for MsBuildProjectParser {
    fn parse(&self, path: &Path) -> Result<ParsedProject, ProjectError> {
        if !path.is_file() {
            return Err(ProjectError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ProjectError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        self.parse_str(path, &content)
    }
}

#[derive(Debug, Default)]
struct PendingReference {
    include: String,
    hint_paths: Vec<String>,
}

#[derive(Debug, Default)]
struct ConfigurationGroup {
    condition: String,
    output_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    AssemblyName,
    OutputType,
    Configuration,
    Platform,
    OutputPath,
    HintPath,
}

#[derive(Debug, Default)]
struct ParseState {
    stack: Vec<String>,
    /// Open `PropertyGroup`: its condition, if any
    group: Option<Option<String>>,
    group_output_path: Option<String>,
    reference: Option<PendingReference>,
    capture: Option<Capture>,
    text: Option<String>,

    assembly_name: Option<String>,
    output_type: Option<String>,
    default_configuration: Option<String>,
    default_platform: Option<String>,
    global_output_path: Option<String>,
    configuration_groups: Vec<ConfigurationGroup>,
    references: Vec<PendingReference>,
    project_references: Vec<String>,
}

impl ParseState {
    fn open(&mut self, name: &str, element: &BytesStart<'_>, empty: bool) {
        match name {
            "PropertyGroup" if !empty => {
                self.group = Some(attribute(element, b"Condition"));
                self.group_output_path = None;
            }
            "Reference" => {
                let reference = PendingReference {
                    include: attribute(element, b"Include").unwrap_or_default(),
                    hint_paths: Vec::new(),
                };
                if empty {
                    self.references.push(reference);
                } else {
                    self.reference = Some(reference);
                }
            }
            "ProjectReference" => {
                if let Some(include) = attribute(element, b"Include") {
                    self.project_references.push(include);
                }
            }
            "HintPath" if self.reference.is_some() && !empty => self.start_capture(Capture::HintPath),
            _ if self.group.is_some() && !empty => {
                let capture = match name {
                    "AssemblyName" => Some(Capture::AssemblyName),
                    "OutputType" => Some(Capture::OutputType),
                    "Configuration" => Some(Capture::Configuration),
                    "Platform" => Some(Capture::Platform),
                    "OutputPath" => Some(Capture::OutputPath),
                    _ => None,
                };
                if let Some(capture) = capture {
                    self.start_capture(capture);
                }
            }
            _ => {}
        }
    }

    fn start_capture(&mut self, capture: Capture) {
        self.capture = Some(capture);
        self.text = Some(String::new());
    }

    fn close(&mut self, name: &str, path: &Path) {
        if let (Some(capture), Some(text)) = (self.capture.take(), self.text.take()) {
            let value = text.trim().to_string();
            let conditioned = matches!(self.group, Some(Some(_)));
            match capture {
                Capture::AssemblyName => {
                    if self.assembly_name.is_some() {
                        tracing::debug!("Ignoring repeated AssemblyName in {}", path.display());
                    }
                    self.assembly_name.get_or_insert(value);
                }
                Capture::OutputType => {
                    self.output_type.get_or_insert(value);
                }
                Capture::Configuration if !conditioned => {
                    self.default_configuration.get_or_insert(value);
                }
                Capture::Platform if !conditioned => {
                    self.default_platform.get_or_insert(value);
                }
                Capture::OutputPath if conditioned => self.group_output_path = Some(value),
                Capture::OutputPath => {
                    self.global_output_path.get_or_insert(value);
                }
                Capture::HintPath => {
                    if let Some(reference) = self.reference.as_mut() {
                        reference.hint_paths.push(value);
                    }
                }
                Capture::Configuration | Capture::Platform => {}
            }
            return;
        }

        match name {
            "PropertyGroup" => {
                if let Some(Some(condition)) = self.group.take() {
                    self.configuration_groups.push(ConfigurationGroup {
                        condition,
                        output_path: self.group_output_path.take(),
                    });
                }
            }
            "Reference" => {
                if let Some(reference) = self.reference.take() {
                    self.references.push(reference);
                }
            }
            _ => {}
        }
    }
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .filter_map(Result::ok)
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| std::str::from_utf8(&attr.value).ok().map(unescape_attribute))
}

fn unescape_attribute(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    let mut result = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        result.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        match tail.find(';') {
            Some(end) => {
                result.push_str(&resolve_entity(&tail[..end]));
                rest = &tail[end + 1..];
            }
            None => {
                result.push('&');
                rest = tail;
            }
        }
    }
    result.push_str(rest);
    result
}

fn resolve_entity(name: &str) -> String {
    let numeric = name
        .strip_prefix("#x")
        .map(|hex| u32::from_str_radix(hex, 16))
        .or_else(|| name.strip_prefix('#').map(str::parse::<u32>));
    if let Some(Ok(code)) = numeric {
        if let Some(c) = char::from_u32(code) {
            return c.to_string();
        }
    }
    match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        other => format!("&{other};"),
    }
}

/// Percent-decode a path item; undecodable input is kept as written
fn decode_path(raw: &str) -> String {
    let trimmed = raw.trim();
    urlencoding::decode(trimmed).map_or_else(|_| trimmed.to_string(), |d| d.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const APP_PROJECT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="4.0" DefaultTargets="Build" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <Configuration Condition=" '$(Configuration)' == '' ">Debug</Configuration>
    <Platform Condition=" '$(Platform)' == '' ">AnyCPU</Platform>
    <OutputType>WinExe</OutputType>
    <AssemblyName>App</AssemblyName>
  </PropertyGroup>
  <PropertyGroup Condition=" '$(Configuration)|$(Platform)' == 'Debug|AnyCPU' ">
    <OutputPath>bin\Debug\</OutputPath>
  </PropertyGroup>
  <PropertyGroup Condition=" '$(Configuration)|$(Platform)' == 'Release|AnyCPU' ">
    <OutputPath>bin\Release\</OutputPath>
  </PropertyGroup>
  <ItemGroup>
    <Reference Include="System" />
    <Reference Include="Vendor.Core, Version=2.0.0.0, Culture=neutral">
      <HintPath>..\Components\Vendor%20Libs\Vendor.Core.dll</HintPath>
    </Reference>
  </ItemGroup>
  <ItemGroup>
    <ProjectReference Include="..\Lib\Lib.csproj">
      <Name>Lib</Name>
    </ProjectReference>
  </ItemGroup>
</Project>
"#;

    const LIB_PROJECT: &str = r#"<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <Configuration>Debug</Configuration>
    <Platform>AnyCPU</Platform>
    <AssemblyName>Lib</AssemblyName>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Configuration)|$(Platform)' == 'debug|anycpu'">
    <OutputPath>bin\Debug\</OutputPath>
  </PropertyGroup>
</Project>
"#;

    fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        canonical_path(&path).unwrap()
    }

    #[test]
    fn test_parse_full_project() {
        let temp = TempDir::new().unwrap();
        let lib = write(temp.path(), "Lib/Lib.csproj", LIB_PROJECT);
        let app = write(temp.path(), "App/App.csproj", APP_PROJECT);

        let parsed = MsBuildProjectParser::new().parse(&app).unwrap();
        assert_eq!(parsed.name, "App");
        assert_eq!(parsed.output_kind, OutputKind::Executable);
        assert_eq!(parsed.project_references, vec![lib]);
        assert_eq!(parsed.configurations.len(), 2);

        let default = &parsed.configurations[parsed.default_configuration.unwrap()];
        assert_eq!(default.configuration, "Debug");
        assert_eq!(default.output_path, r"bin\Debug\");

        assert_eq!(parsed.assembly_references.len(), 2);
        assert_eq!(parsed.assembly_references[0].short_name(), "System");
        assert!(parsed.assembly_references[0].hint_path.is_none());

        let vendor = &parsed.assembly_references[1];
        assert_eq!(vendor.short_name(), "Vendor.Core");
        assert_eq!(
            vendor.explicit_hint_path.as_deref(),
            Some(r"..\Components\Vendor Libs\Vendor.Core.dll")
        );
        let expected = canonical_path(temp.path())
            .unwrap()
            .join("Components")
            .join("Vendor Libs")
            .join("Vendor.Core.dll");
        assert_eq!(vendor.hint_path.as_deref(), Some(expected.as_path()));
    }

    #[test]
    fn test_default_configuration_matches_ignoring_case() {
        let temp = TempDir::new().unwrap();
        let lib = write(temp.path(), "Lib/Lib.csproj", LIB_PROJECT);

        let parsed = MsBuildProjectParser::new().parse(&lib).unwrap();
        assert_eq!(parsed.output_kind, OutputKind::Library);
        assert_eq!(parsed.default_configuration, Some(0));
        assert_eq!(parsed.default_labels, ("Debug".to_string(), "AnyCPU".to_string()));
    }

    #[test]
    fn test_no_matching_default_configuration() {
        let xml = r#"<Project>
  <PropertyGroup>
    <Configuration>Debug</Configuration>
    <Platform>x86</Platform>
    <AssemblyName>Tool</AssemblyName>
  </PropertyGroup>
  <PropertyGroup Condition=" '$(Configuration)|$(Platform)' == 'Debug|AnyCPU' ">
    <OutputPath>bin\Debug\</OutputPath>
  </PropertyGroup>
</Project>"#;
        let parsed = MsBuildProjectParser::new()
            .parse_str(Path::new("/work/Tool/Tool.csproj"), xml)
            .unwrap();
        assert_eq!(parsed.configurations.len(), 1);
        assert!(parsed.default_configuration.is_none());
    }

    #[test]
    fn test_multiple_hint_paths_rejected() {
        let xml = r#"<Project>
  <PropertyGroup><AssemblyName>Lib</AssemblyName></PropertyGroup>
  <ItemGroup>
    <Reference Include="Vendor.Core">
      <HintPath>a\Vendor.Core.dll</HintPath>
      <HintPath>b\Vendor.Core.dll</HintPath>
    </Reference>
  </ItemGroup>
</Project>"#;
        let err = MsBuildProjectParser::new()
            .parse_str(Path::new("/work/Lib/Lib.csproj"), xml)
            .unwrap_err();
        assert!(matches!(err, ProjectError::MultipleHintPaths { ref assembly, .. } if assembly == "Vendor.Core"));
    }

    #[test]
    fn test_missing_assembly_name() {
        let err = MsBuildProjectParser::new()
            .parse_str(Path::new("/work/X/X.csproj"), "<Project><PropertyGroup/></Project>")
            .unwrap_err();
        assert!(matches!(err, ProjectError::MissingAssemblyName { .. }));
    }

    #[test]
    fn test_missing_referenced_project() {
        let xml = r#"<Project>
  <PropertyGroup><AssemblyName>App</AssemblyName></PropertyGroup>
  <ItemGroup><ProjectReference Include="..\Gone\Gone.csproj" /></ItemGroup>
</Project>"#;
        let temp = TempDir::new().unwrap();
        let app = write(temp.path(), "App/App.csproj", xml);
        let err = MsBuildProjectParser::new().parse(&app).unwrap_err();
        assert!(matches!(err, ProjectError::ReferencedProjectMissing { .. }));
    }

    #[test]
    fn test_missing_file_and_malformed_xml() {
        let temp = TempDir::new().unwrap();
        let parser = MsBuildProjectParser::new();
        let err = parser.parse(&temp.path().join("Nope.csproj")).unwrap_err();
        assert!(matches!(err, ProjectError::FileNotFound { .. }));

        let broken = write(temp.path(), "Broken.csproj", "<Project><PropertyGroup></Project>");
        let err = parser.parse(&broken).unwrap_err();
        assert!(matches!(err, ProjectError::Xml { .. }));
    }

    #[test]
    fn test_unescape_attribute() {
        assert_eq!(unescape_attribute("a &amp; b"), "a & b");
        assert_eq!(unescape_attribute("&apos;x&apos;"), "'x'");
        assert_eq!(unescape_attribute("&#65;"), "A");
        assert_eq!(unescape_attribute("plain"), "plain");
    }
}
