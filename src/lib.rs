// src/lib.rs
//! Scrape LinkedIn job postings and extract the skills each one asks for.

pub mod config;
pub mod core;
pub mod error;
pub mod linkedin_analysis;
pub mod pipeline;
pub mod types;

pub use config::{Credentials, ScraperConfig, SourceKind};
pub use error::PipelineError;
pub use pipeline::{Pipeline, RunOutcome};
