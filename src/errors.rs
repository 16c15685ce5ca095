//! Build error taxonomy.
//!
//! Every error kind here is fatal to the current resolution pass: the graph
//! aborts with no partial output. Best-effort lookups (directive tokens,
//! animation tokens, optional-library globs) never produce an error at all,
//! so they have no variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// A script file could not be parsed into a syntax tree.
    #[error("parse error in {path}:{line}:{col}: {message}")]
    Parse {
        path: String,
        message: String,
        line: usize,
        col: usize,
    },

    /// Two files register the same kind-qualified component identity.
    #[error("component \"{identity}\" is defined in both {first} and {second}")]
    DuplicateDefinition {
        identity: String,
        first: String,
        second: String,
    },

    /// A required file references an identity that no ingested file defines
    /// and that is not covered by the global-dependency allowlist.
    #[error("cannot find dependency \"{identity}\" required by {required_by}")]
    MissingDependency {
        identity: String,
        required_by: String,
    },

    /// A configured seed path was never ingested.
    #[error("seed file not found in file set: {path}")]
    MissingSeed { path: String },

    /// The closure references a path with no backing source file. This
    /// indicates an internal index inconsistency, not a user mistake.
    #[error("required file has no backing source: {path}")]
    UnresolvableOutput { path: String },

    /// A module chain registered a component under a kind this tool does
    /// not model.
    #[error("unknown component kind \"{kind}\" in {path}")]
    UnknownComponentKind { kind: String, path: String },
}

impl BuildError {
    /// File paths involved in this error, for diagnostics.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            BuildError::Parse { path, .. }
            | BuildError::MissingSeed { path }
            | BuildError::UnresolvableOutput { path }
            | BuildError::UnknownComponentKind { path, .. } => vec![path],
            BuildError::DuplicateDefinition { first, second, .. } => vec![first, second],
            BuildError::MissingDependency { required_by, .. } => vec![required_by],
        }
    }
}
