//! Static analysis and formatter planning for MessagePack-annotated type graphs.
//!
//! Pipeline per root: [`graph::collect`] → [`validate::validate`] →
//! [`resolve::Resolver`] → [`table::ResolverTable`]. [`analysis::Session`]
//! drives it, one root or many.
pub mod analysis;
pub mod cli;
pub mod diagnostics;
pub mod graph;
pub mod identity;
pub mod jq_exec;
pub mod path_de;
pub mod resolve;
pub mod symbols;
pub mod table;
pub mod validate;
pub mod wellknown;

pub use analysis::{AnalysisError, AnalyzerOptions, CancellationToken, Plan, Session};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use symbols::{SymbolProvider, Universe};
