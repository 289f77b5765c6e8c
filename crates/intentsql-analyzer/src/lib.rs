//! Static analysis of schema and query sources
//!
//! This crate handles:
//! - Reconstructing tables, columns and foreign keys from the fluent
//!   schema builder DSL ([`SchemaAnalyzer`])
//! - Unwinding column method chains into ordered call records ([`MethodChain`])
//! - Locating natural-language query sites and deriving their identity
//!   ([`QueryCollector`])

pub mod chain;
pub mod collector;
pub mod error;
pub mod schema_analyzer;

pub use chain::{ChainCall, MethodChain};
pub use collector::QueryCollector;
pub use error::AnalyzerError;
pub use schema_analyzer::SchemaAnalyzer;
