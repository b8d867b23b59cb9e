//! Graph command implementation
//!
//! Implements `slnresolve graph` to export the solution or project dependency graph as
//! DOT, an edge list or JSON, optionally rendered through Graphviz.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::session::Session;
use super::GraphFormat;
use crate::cli::output::{is_json, print_success, print_warning};
use crate::core::graph::DependencyGraph;
use crate::infra::filesystem::write_file;
use crate::infra::process::{run_checked, SystemProcessRunner};

/// Graph options
pub struct GraphOptions {
    /// Export the project graph
    pub projects: bool,
    pub output: Option<PathBuf>,
    pub format: GraphFormat,
    /// Graphviz output format, e.g. `svg`
    pub render: Option<String>,
}

/// Execute the graph command
pub fn execute(session: &Session, options: &GraphOptions) -> Result<()> {
    if options.render.is_some() && options.output.is_none() {
        bail!("--render requires --output");
    }
    let info = session.dependency_info()?;

    let text = if options.projects {
        let graph = info
            .project_graph
            .map_vertices(|&id| session.index.project(id).name.clone());
        render(&graph, "projects", options.format, |name| name.clone())
    } else {
        render(&info.solution_graph, "solutions", options.format, |path| {
            path.display().to_string()
        })
    };

    let Some(output) = &options.output else {
        print!("{text}");
        return Ok(());
    };

    write_file(output, &text)?;
    print_success(&format!("Graph written to {}", output.display()));

    if let Some(format) = &options.render {
        render_with_graphviz(output, format)?;
    }
    Ok(())
}

fn render<V: Ord + Clone>(
    graph: &DependencyGraph<V>,
    name: &str,
    format: GraphFormat,
    label: impl Fn(&V) -> String,
) -> String {
    if is_json() {
        let json = serde_json::json!({
            "vertices": graph.vertices().map(&label).collect::<Vec<_>>(),
            "edges": graph.edges().map(|(from, to)| [label(from), label(to)]).collect::<Vec<_>>(),
        });
        return format!("{}\n", serde_json::to_string_pretty(&json).unwrap_or_default());
    }
    match format {
        GraphFormat::Dot => graph.to_dot(name, label),
        GraphFormat::Edges => graph.to_edge_list(label),
    }
}

fn render_with_graphviz(dot_file: &Path, format: &str) -> Result<()> {
    let Ok(dot) = which::which("dot") else {
        print_warning("Graphviz 'dot' not found on PATH, skipping rendering");
        return Ok(());
    };

    let rendered = dot_file.with_extension(format);
    let args = vec![
        format!("-T{format}"),
        "-o".to_string(),
        rendered.display().to_string(),
        dot_file.display().to_string(),
    ];
    run_checked(
        &SystemProcessRunner,
        &dot,
        &args,
        "dot",
        &format!("Graphviz failed to render {}", dot_file.display()),
    )
    .with_context(|| format!("Failed to render {}", dot_file.display()))?;
    print_success(&format!("Rendered {}", rendered.display()));
    Ok(())
}
