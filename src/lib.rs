//! slnresolve - cross-solution dependency resolver for .NET source trees
//!
//! Indexes every `.csproj` and `.sln` under a base path, resolves the dependencies between
//! projects and solutions, and drives component propagation and ordered builds.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Index, dependency resolution, propagation and build orchestration
//! - [`infra`] - Infrastructure layer (filesystem, binary metadata, processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
