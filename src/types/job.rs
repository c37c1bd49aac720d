// src/types/job.rs
//! Job posting records as they move through the scrape pipeline

use serde::{Deserialize, Serialize};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

// ===== Search =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSearch {
    pub query: String,
    pub location: String,
    pub limit: usize,
}

impl JobSearch {
    pub fn new(query: impl Into<String>, location: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
            limit,
        }
    }
}

// ===== Acquired records =====

/// Description payload as delivered by an acquisition source.
///
/// The rendered page hands back plain text; the Voyager API hands back either
/// a string or an object such as `{"text": "...", "attributes": [...]}`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDescription {
    Text(String),
    Structured(serde_json::Value),
}

impl From<serde_json::Value> for RawDescription {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => RawDescription::Text(text),
            other => RawDescription::Structured(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawJobRecord {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<RawDescription>,
}

/// A job that survived normalization. `description` is trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedJob {
    pub title: String,
    pub company: String,
    pub description: String,
}

// ===== Output =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedJob {
    pub title: String,
    pub company: String,
    pub skills: Vec<String>,
}
