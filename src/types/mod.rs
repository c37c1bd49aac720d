// src/types/mod.rs
pub mod job;

pub use job::{JobSearch, NormalizedJob, ProcessedJob, RawDescription, RawJobRecord};
