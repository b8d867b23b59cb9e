//! Integration tests for dependency resolution
//!
//! Builds source trees on disk, indexes them and checks the project and solution graphs
//! and build orders.

mod common;

use std::path::PathBuf;

use common::{ProjectSpec, TestProject};
use slnresolve::core::index::ProjectIndex;
use slnresolve::core::project::ProjectId;
use slnresolve::core::resolver::{
    build_order, deep_dependencies, get_dependency_info, project_build_order,
};
use slnresolve::error::ResolverError;

/// A -> B -> C -> D through project references, all in one solution
fn chain() -> TestProject {
    let tree = TestProject::new();
    tree.add_project("A/A.csproj", &ProjectSpec::library("A").project_reference(r"..\B\B.csproj"));
    tree.add_project("B/B.csproj", &ProjectSpec::library("B").project_reference(r"..\C\C.csproj"));
    tree.add_project("C/C.csproj", &ProjectSpec::library("C").project_reference(r"..\D\D.csproj"));
    tree.add_project("D/D.csproj", &ProjectSpec::library("D"));
    tree.add_solution(
        "All.sln",
        &[r"A\A.csproj", r"B\B.csproj", r"C\C.csproj", r"D\D.csproj"],
    );
    tree
}

fn project_edges(tree: &TestProject, max_level: i32) -> Vec<(String, String)> {
    let index = tree.index();
    let info = get_dependency_info(&index, &[tree.file("A/A.csproj")], &[], max_level).unwrap();
    info.project_graph
        .edges()
        .map(|(from, to)| (index.project(*from).name.clone(), index.project(*to).name.clone()))
        .collect()
}

fn edge(from: &str, to: &str) -> (String, String) {
    (from.to_string(), to.to_string())
}

#[test]
fn test_unbounded_recursion_follows_whole_chain() {
    let tree = chain();
    let mut edges = project_edges(&tree, -1);
    edges.sort();
    assert_eq!(edges, vec![edge("B", "A"), edge("C", "B"), edge("D", "C")]);
}

#[test]
fn test_recursion_level_zero_keeps_direct_dependencies() {
    let tree = chain();
    assert_eq!(project_edges(&tree, 0), vec![edge("B", "A")]);
}

#[test]
fn test_recursion_level_one() {
    let tree = chain();
    let mut edges = project_edges(&tree, 1);
    edges.sort();
    assert_eq!(edges, vec![edge("B", "A"), edge("C", "B")]);
}

#[test]
fn test_project_build_order_puts_dependencies_first() {
    let tree = chain();
    let index = tree.index();
    let info = get_dependency_info(&index, &[tree.file("A/A.csproj")], &[], -1).unwrap();

    let order: Vec<String> = project_build_order(&index, &info.project_graph)
        .unwrap()
        .into_iter()
        .map(|id| index.project(id).name.clone())
        .collect();
    assert_eq!(order, vec!["D", "C", "B", "A"]);
}

/// Core.sln builds Lib; App.sln has Main, which references Lib.dll through a hint path
fn cross_solution() -> TestProject {
    let tree = TestProject::new();
    tree.add_project("Core/Lib/Lib.csproj", &ProjectSpec::library("Lib"));
    tree.add_solution("Core/Core.sln", &[r"Lib\Lib.csproj"]);
    tree.add_project(
        "App/Main/Main.csproj",
        &ProjectSpec::executable("Main").reference("Lib", Some(r"..\Components\Lib.dll")),
    );
    tree.add_solution("App/App.sln", &[r"Main\Main.csproj"]);
    tree
}

#[test]
fn test_cross_solution_edge_from_assembly_reference() {
    let tree = cross_solution();
    let index = tree.index();
    let info = get_dependency_info(&index, &[tree.file("App/App.sln")], &[], -1).unwrap();

    let edges: Vec<(PathBuf, PathBuf)> = info
        .solution_graph
        .edges()
        .map(|(from, to)| (from.clone(), to.clone()))
        .collect();
    assert_eq!(edges, vec![(tree.file("Core/Core.sln"), tree.file("App/App.sln"))]);

    let order = build_order(&info.trimmed_solution_graph).unwrap();
    assert_eq!(order, vec![tree.file("Core/Core.sln"), tree.file("App/App.sln")]);
}

#[test]
fn test_excluded_solution_is_trimmed() {
    let tree = cross_solution();
    let index = tree.index();
    let info = get_dependency_info(
        &index,
        &[tree.file("App/App.sln")],
        &[tree.file("Core/Core.sln")],
        -1,
    )
    .unwrap();

    assert_eq!(info.solution_graph.vertex_count(), 2);
    assert_eq!(
        build_order(&info.trimmed_solution_graph).unwrap(),
        vec![tree.file("App/App.sln")]
    );
}

#[test]
fn test_mutual_dependency_needs_exclusion() {
    let tree = TestProject::new();
    tree.add_project(
        "One/P1/P1.csproj",
        &ProjectSpec::library("P1").reference("P2", Some(r"..\Components\P2.dll")),
    );
    tree.add_solution("One/One.sln", &[r"P1\P1.csproj"]);
    tree.add_project(
        "Two/P2/P2.csproj",
        &ProjectSpec::library("P2").reference("P1", Some(r"..\Components\P1.dll")),
    );
    tree.add_solution("Two/Two.sln", &[r"P2\P2.csproj"]);

    let index = tree.index();
    let inputs = [tree.file("One/One.sln")];
    let info = get_dependency_info(&index, &inputs, &[], -1).unwrap();
    let err = build_order(&info.trimmed_solution_graph).unwrap_err();
    assert!(matches!(err, ResolverError::CyclicSolutionGraph { .. }));

    let info = get_dependency_info(&index, &inputs, &[tree.file("Two/Two.sln")], -1).unwrap();
    assert_eq!(
        build_order(&info.trimmed_solution_graph).unwrap(),
        vec![tree.file("One/One.sln")]
    );
}

#[test]
fn test_unknown_input_kind() {
    let tree = chain();
    tree.create_file("notes.txt", "hello");
    let index = tree.index();

    let err = get_dependency_info(&index, &[tree.file("notes.txt")], &[], -1).unwrap_err();
    assert!(matches!(err, ResolverError::UnknownFileKind { .. }));
}

#[test]
fn test_exclusion_must_be_a_solution() {
    let tree = chain();
    let index = tree.index();

    let err = get_dependency_info(
        &index,
        &[tree.file("All.sln")],
        &[tree.file("A/A.csproj")],
        -1,
    )
    .unwrap_err();
    assert!(matches!(err, ResolverError::InvalidExclusion { .. }));
}

fn named_edges(index: &ProjectIndex, edges: &[(ProjectId, ProjectId)]) -> Vec<(String, String)> {
    edges
        .iter()
        .map(|&(from, to)| (index.project(from).name.clone(), index.project(to).name.clone()))
        .collect()
}

#[test]
fn test_project_cycle_terminates_with_reentry_edge_once() {
    let tree = TestProject::new();
    tree.add_project("A/A.csproj", &ProjectSpec::library("A").project_reference(r"..\B\B.csproj"));
    tree.add_project("B/B.csproj", &ProjectSpec::library("B").project_reference(r"..\A\A.csproj"));
    tree.add_solution("All.sln", &[r"A\A.csproj", r"B\B.csproj"]);
    let index = tree.index();
    let a = index.project_by_path(&tree.file("A/A.csproj")).unwrap();

    let edges = deep_dependencies(&index, &[a], false, -1).unwrap();
    assert_eq!(named_edges(&index, &edges), vec![edge("A", "B"), edge("B", "A")]);
}

#[test]
fn test_visited_target_still_gets_its_edge() {
    let tree = TestProject::new();
    tree.add_project(
        "A/A.csproj",
        &ProjectSpec::library("A")
            .project_reference(r"..\B\B.csproj")
            .project_reference(r"..\C\C.csproj"),
    );
    tree.add_project("B/B.csproj", &ProjectSpec::library("B").project_reference(r"..\D\D.csproj"));
    tree.add_project("C/C.csproj", &ProjectSpec::library("C").project_reference(r"..\D\D.csproj"));
    tree.add_project("D/D.csproj", &ProjectSpec::library("D"));
    tree.add_solution(
        "All.sln",
        &[r"A\A.csproj", r"B\B.csproj", r"C\C.csproj", r"D\D.csproj"],
    );
    let index = tree.index();
    let a = index.project_by_path(&tree.file("A/A.csproj")).unwrap();

    let mut edges = named_edges(&index, &deep_dependencies(&index, &[a], false, -1).unwrap());
    edges.sort();
    assert_eq!(
        edges,
        vec![edge("A", "B"), edge("A", "C"), edge("B", "D"), edge("C", "D")]
    );
}

#[test]
fn test_isolated_seed_is_a_vertex_in_both_graphs() {
    let tree = TestProject::new();
    tree.add_project("E/E.csproj", &ProjectSpec::library("E"));
    tree.add_solution("E/E.sln", &[r"E.csproj"]);
    let index = tree.index();

    let info = get_dependency_info(&index, &[tree.file("E/E.csproj")], &[], -1).unwrap();
    assert_eq!(info.project_graph.vertex_count(), 1);
    assert_eq!(info.project_graph.edge_count(), 0);
    assert_eq!(info.solution_graph.vertex_count(), 1);
    assert!(info.solution_graph.contains(&tree.file("E/E.sln")));
    assert_eq!(build_order(&info.trimmed_solution_graph).unwrap(), vec![tree.file("E/E.sln")]);
}

#[test]
fn test_untrimmed_graph_keeps_excluded_solution() {
    let tree = cross_solution();
    let index = tree.index();
    let core = tree.file("Core/Core.sln");
    let app = tree.file("App/App.sln");

    let info = get_dependency_info(&index, &[app.clone()], &[core.clone()], -1).unwrap();
    assert!(info.solution_graph.contains(&core));
    assert!(info.solution_graph.out_edges(&core).any(|s| *s == app));
    assert!(!info.trimmed_solution_graph.contains(&core));
    assert_eq!(info.trimmed_solution_graph.edge_count(), 0);
}
