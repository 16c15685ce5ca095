//! Per-file static analysis: fact records, file nodes and the two
//! analyzers that populate them.

pub mod markup;
pub mod node;
pub mod record;
pub mod script;
pub mod source;

pub use node::FileNode;
pub use record::{ComponentKind, DependencyKind, FactRecord, ResolvePolicy};
pub use source::{ChangeKind, SourceFile, normalize_path};
