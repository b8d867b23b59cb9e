//! Core business logic module
//!
//! Side effects (filesystem, processes, binary reads) go through [`crate::infra`].
//!
//! # Submodules
//!
//! - [`project`] - Project model and registry
//! - [`parser`] - MSBuild project file parsing
//! - [`solution`] - Solution file reading
//! - [`index`] - Project and solution index over a source tree
//! - [`graph`] - Directed dependency graph
//! - [`resolver`] - Dependency resolution and build order
//! - [`filter`] - Assembly name filter
//! - [`propagate`] - Component propagation between solutions
//! - [`builder`] - Build orchestration
//! - [`export`] - MSBuild driver and NuSpec generation
//! - [`check`] - Project validation
//! - [`settings`] - Settings file handling

pub mod builder;
pub mod check;
pub mod export;
pub mod filter;
pub mod graph;
pub mod index;
pub mod parser;
pub mod project;
pub mod propagate;
pub mod resolver;
pub mod settings;
pub mod solution;
pub mod text;
