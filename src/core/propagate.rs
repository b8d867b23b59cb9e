//! Component propagation
//!
//! Copies the built outputs of every project a solution references by hint path into the
//! hint path's directory. Assemblies those outputs reference in turn are followed when
//! they are built by the same solution as the output that pulled them in; the others are
//! reported and left alone.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::core::filter::NameFilter;
use crate::core::index::ProjectIndex;
use crate::core::project::{short_assembly_name, AssemblyReference, OutputKind, ProjectId};
use crate::core::text::{count_with_sample, tabify};
use crate::error::{MetadataError, PropagationError};
use crate::infra::filesystem::{copy_into, path_key};
use crate::infra::metadata::{is_binary, ReferenceReader};

/// Propagation settings
#[derive(Debug, Clone, Copy)]
pub struct PropagationOptions<'a> {
    pub filter: &'a NameFilter,
    /// Skip projects that were never built and files that vanished
    pub ignore_missing: bool,
}

/// Outputs of one builder copied for one reference
#[derive(Debug, Clone)]
pub struct CopiedComponent {
    pub reference: AssemblyReference,
    pub builder: ProjectId,
    pub target_dir: PathBuf,
    /// Copied files, at their destination
    pub files: Vec<PathBuf>,
}

/// An assembly pulled in by a copied output
#[derive(Debug, Clone)]
pub struct IndirectReferenceRecord {
    pub direct_reference: AssemblyReference,
    /// Builder of `direct_reference`
    pub direct_project: ProjectId,
    pub indirect_reference: AssemblyReference,
    pub indirect_project: Option<ProjectId>,
}

/// Outcome of one propagation run
#[derive(Debug, Clone, Default)]
pub struct PropagationReport {
    pub copied: Vec<CopiedComponent>,
    /// Excluded by the name filter
    pub ignored: Vec<AssemblyReference>,
    /// No hint path to copy to
    pub bad_hint_path: Vec<AssemblyReference>,
    /// No single project builds the assembly
    pub missing_project: Vec<AssemblyReference>,
    /// Builders without an output directory, skipped under `ignore_missing`
    pub unbuilt_project: Vec<ProjectId>,
    /// Indirect references from other solutions, one per assembly name that the solution
    /// does not declare itself
    pub outside_solution: Vec<IndirectReferenceRecord>,
}

impl PropagationReport {
    /// Whether any component was copied for `name`, ignoring case
    pub fn copied_name(&self, name: &str) -> bool {
        self.copied
            .iter()
            .any(|c| c.reference.short_name().eq_ignore_ascii_case(name))
    }
}

struct Propagation<'a> {
    index: &'a ProjectIndex,
    options: PropagationOptions<'a>,
    reader: &'a dyn ReferenceReader,
    declared: HashSet<String>,
    known: HashSet<String>,
    reported_outside: HashSet<String>,
    queue: VecDeque<AssemblyReference>,
    report: PropagationReport,
}

/// Copy every component `solution` needs from the projects that build it
pub fn propagate_components(
    index: &ProjectIndex,
    solution: &Path,
    options: &PropagationOptions<'_>,
    reader: &dyn ReferenceReader,
) -> Result<PropagationReport, PropagationError> {
    tracing::debug!(
        "Updating components: {} (copying dependencies required for '{}')...",
        file_name(solution),
        solution.display()
    );

    let mut seen = HashSet::new();
    let mut references = Vec::new();
    for &id in index.projects_of_solution(solution)? {
        for reference in &index.project(id).assembly_references {
            if seen.insert(reference.clone()) {
                references.push(reference.clone());
            }
        }
    }
    let declared: HashSet<String> = references.iter().map(AssemblyReference::name_key).collect();

    let mut run = Propagation {
        index,
        options: *options,
        reader,
        known: declared.clone(),
        declared,
        reported_outside: HashSet::new(),
        queue: references.into(),
        report: PropagationReport::default(),
    };
    while let Some(reference) = run.queue.pop_front() {
        run.process(reference)?;
    }

    log_uncopied(&run.report, options.filter, index);
    log_outside_solution(&run.report, index);
    tracing::info!(
        "Updated components required by: {} ('{}')",
        file_name(solution),
        solution.display()
    );
    Ok(run.report)
}

impl Propagation<'_> {
    fn process(&mut self, reference: AssemblyReference) -> Result<(), PropagationError> {
        if !self.options.filter.includes(&reference.name) {
            tracing::debug!("Not copying ignored assembly: {reference}");
            self.report.ignored.push(reference);
            return Ok(());
        }

        let Some(target_dir) = reference.hint_path.as_deref().and_then(Path::parent) else {
            tracing::debug!(
                "Can't copy dependency (no target path): missing HintPath for '{}', used by:\n{}",
                reference.name,
                projects_using(self.index, &reference)
            );
            self.report.bad_hint_path.push(reference);
            return Ok(());
        };
        let target_dir = target_dir.to_path_buf();

        let Some(builder) = self.index.find_single_project(&reference) else {
            tracing::debug!(
                "Can't find dependency: no single project builds '{}', used by:\n{}",
                reference.name,
                projects_using(self.index, &reference)
            );
            self.report.missing_project.push(reference);
            return Ok(());
        };

        if self.options.ignore_missing && !self.index.absolute_output_path(builder)?.is_dir() {
            tracing::debug!(
                "Ignoring (not copying) all components from project that is not built: {}",
                self.index.project(builder)
            );
            self.report.unbuilt_project.push(builder);
            return Ok(());
        }

        let outputs = self.index.built_outputs(builder)?;
        tracing::info!(
            "Copy: {:<40} -> {}",
            self.index.project(builder).name,
            target_dir.display()
        );
        let files = self.copy_outputs(&outputs, &target_dir)?;
        self.discover_indirect(&reference, builder, &files, &target_dir)?;

        self.report.copied.push(CopiedComponent {
            reference,
            builder,
            target_dir,
            files,
        });
        Ok(())
    }

    fn copy_outputs(&self, outputs: &[PathBuf], target_dir: &Path) -> Result<Vec<PathBuf>, PropagationError> {
        let mut copied = Vec::with_capacity(outputs.len());
        for source in outputs {
            if self.options.ignore_missing && !source.is_file() {
                tracing::debug!("copy: ignoring missing file {}", source.display());
                continue;
            }
            tracing::debug!("copy: {} -> {}", source.display(), target_dir.display());
            copied.push(copy_into(source, target_dir)?);
        }
        Ok(copied)
    }

    fn discover_indirect(
        &mut self,
        direct: &AssemblyReference,
        builder: ProjectId,
        copied: &[PathBuf],
        target_dir: &Path,
    ) -> Result<(), PropagationError> {
        let mut indirect = Vec::new();
        let mut batch = HashSet::new();
        for binary in copied.iter().filter(|f| is_binary(f)) {
            let names = match self.reader.referenced_assembly_names(binary) {
                Ok(names) => names,
                Err(MetadataError::NotManaged { .. } | MetadataError::NotPortableExecutable { .. }) => {
                    tracing::debug!("Not reading references of unmanaged binary {}", binary.display());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            for name in names {
                let short = short_assembly_name(&name).to_string();
                let key = short.to_lowercase();
                if self.known.contains(&key) || !batch.insert(key) {
                    continue;
                }
                let file = format!("{short}.dll");
                let reference = AssemblyReference::new(
                    name,
                    Some(target_dir.join(&file)),
                    direct.explicit_hint_path.as_deref().map(|h| sibling_path(h, &file)),
                );
                if self.options.filter.includes(&reference.name) {
                    indirect.push(reference);
                }
            }
        }
        if indirect.is_empty() {
            return Ok(());
        }

        tracing::info!(
            "Adding indirect references listed below. The direct reference is to {}.\n{}\n\
             Some project probably references {} without referencing all of the assemblies \
             above. Projects referencing {}:\n{}",
            direct.name,
            tabify(indirect.iter().map(|r| r.name.as_str())),
            direct.short_name(),
            direct.short_name(),
            projects_using(self.index, direct)
        );

        let builder_solution = self.index.owning_solution(builder).ok().map(path_key);
        for reference in indirect {
            let indirect_project = self.index.find_single_project(&reference);
            let same_solution = match (indirect_project, &builder_solution) {
                (Some(project), Some(solution)) => self
                    .index
                    .owning_solution(project)
                    .is_ok_and(|s| path_key(s) == *solution),
                _ => false,
            };

            let key = reference.name_key();
            if same_solution {
                self.known.insert(key);
                self.queue.push_back(reference);
            } else if !self.declared.contains(&key) && self.reported_outside.insert(key) {
                self.report.outside_solution.push(IndirectReferenceRecord {
                    direct_reference: direct.clone(),
                    direct_project: builder,
                    indirect_reference: reference,
                    indirect_project,
                });
            }
        }
        Ok(())
    }
}

/// `dir\Other.dll` for an explicit hint path `dir\This.dll`, keeping its separator
fn sibling_path(explicit_hint_path: &str, file_name: &str) -> String {
    match explicit_hint_path.rfind(['\\', '/']) {
        Some(at) => format!("{}{file_name}", &explicit_hint_path[..=at]),
        None => file_name.to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn projects_using(index: &ProjectIndex, reference: &AssemblyReference) -> String {
    let users: Vec<String> = index
        .projects_using_reference(reference)
        .into_iter()
        .map(|id| index.project(id).to_string())
        .collect();
    tabify(users.iter().map(String::as_str))
}

fn log_uncopied(report: &PropagationReport, filter: &NameFilter, index: &ProjectIndex) {
    let names = |refs: &[AssemblyReference]| refs.iter().map(|r| r.name.clone()).collect::<Vec<_>>();

    if let Some(ignored) = count_with_sample(
        &names(&report.ignored),
        &format!("ignored assemblies ({filter})"),
    ) {
        tracing::debug!("Ignored dependencies: {ignored}");
    }

    let unbuilt: Vec<String> = report
        .unbuilt_project
        .iter()
        .map(|&id| index.project(id).name.clone())
        .collect();
    let lines: Vec<String> = [
        count_with_sample(&names(&report.bad_hint_path), "assemblies with missing or wrong HintPath"),
        count_with_sample(&names(&report.missing_project), "assemblies from unknown projects"),
        count_with_sample(
            &unbuilt,
            "assemblies from projects that are not built (could not find outputs)",
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    if !lines.is_empty() {
        tracing::warn!(
            "Dependencies not copied (see verbose output for details):\n{}",
            tabify(lines.iter().map(String::as_str))
        );
    }
}

fn log_outside_solution(report: &PropagationReport, index: &ProjectIndex) {
    for record in &report.outside_solution {
        let direct_project = index.project(record.direct_project);
        let built_by = record
            .indirect_project
            .map_or_else(|| "(no single building project)".to_string(), |id| index.project(id).to_string());
        let message = format!(
            "Skipped indirect reference built outside the solution of the direct reference that pulled it in:\n\
             \x20   Indirect reference:             {}\n\
             \x20   Indirect reference built by:    {}\n\
             \x20   Required by project:            {} - {}\n\
             \x20   Which builds reference:         {}\n\
             \x20   Which is used directly by projects:\n{}\n",
            record.indirect_reference,
            built_by,
            direct_project.output_kind,
            direct_project,
            record.direct_reference,
            projects_using(index, &record.direct_reference)
        );
        if direct_project.output_kind == OutputKind::Executable {
            tracing::error!("{message}");
        } else {
            tracing::warn!("{message}");
        }
    }
}
