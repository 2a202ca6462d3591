//! repolens: repository analysis pipeline.
//!
//! Walks a repository, builds bounded prompt contexts from cheap static
//! analysis, asks a chat model for findings (with a deterministic offline
//! fallback), normalizes the answers, and optionally files them as GitHub
//! issues in priority order.

pub mod ai;
pub mod analysis;
pub mod config;
pub mod context;
pub mod findings;
pub mod github;
pub mod interpret;
pub mod pipeline;
pub mod prompt;
pub mod report;
