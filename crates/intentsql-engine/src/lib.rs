//! intentsql engine - build-level decisions
//!
//! This crate implements the logic that sits between collection and
//! generation:
//! - Change categorization against previously generated output
//! - The build-scoped registry of generated queries

pub mod categorizer;
pub mod registry;

pub use categorizer::{Categorization, ChangeCategorizer, ChangeKind};
pub use registry::QueryRegistry;
