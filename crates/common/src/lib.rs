//! Cognify Common Library
//!
//! Shared code for the Cognify study assistant:
//! - Domain types for materials, guides, assessments and results
//! - Input and model-output validation
//! - Prompt templates, the LLM client and the AI flows built on it
//! - Content acquisition from text, web pages and uploaded files
//! - Per-user document storage (PostgreSQL or in-memory)
//! - Timed assessment attempts and progress summaries
//! - Error types, configuration, authentication and metrics

pub mod acquisition;
pub mod ai;
pub mod attempt;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod metrics;
pub mod progress;
pub mod prompts;
pub mod service;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use flows::AiFlows;
pub use service::StudyService;
pub use store::{DocumentStore, MemoryStore, PendingWrite};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
