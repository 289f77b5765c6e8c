//! Analyzer errors
//!
//! Only caller-level failures surface here. Source that does not match a
//! recognized pattern is skipped, never reported.

use intentsql_syntax::SyntaxError;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}
