//! ngbuild - dependency-ordered AngularJS build assembly
//!
//! ngbuild is a CLI tool and library that statically analyzes an AngularJS
//! codebase (scripts and markup templates), computes the transitive closure
//! of files an application actually needs starting from its seed files, and
//! emits them in dependency-safe order behind a synthesized bootstrap file.
//!
//! ## Module Structure
//!
//! - `analysis`: Per-file fact extraction (script and markup analyzers)
//! - `cli`: Command-line interface layer
//! - `config`: Configuration file loading and parsing
//! - `errors`: Build error taxonomy
//! - `graph`: Dependency graph, closure resolution and ordering

pub mod analysis;
pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
