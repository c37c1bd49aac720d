// src/linkedin_analysis/mod.rs
use crate::config::{Credentials, ScraperConfig, SourceKind};
use crate::error::PipelineError;
use crate::types::{JobSearch, RawJobRecord};
use async_trait::async_trait;

pub mod api_source;
pub mod browser_session;
pub mod browser_source;
pub mod model_client;
pub mod normalizer;
pub mod skill_extractor;
pub mod types;
pub mod voyager_client;

pub use api_source::ApiJobSource;
pub use browser_source::BrowserJobSource;
pub use model_client::{GeminiClient, LanguageModel};
pub use normalizer::{normalize_description, normalize_job};
pub use skill_extractor::{SkillExtractor, SkillOutcome};

/// An authenticated way of pulling job postings off LinkedIn.
///
/// `authenticate` opens the session and must be called first. `release` tears the
/// session down and is safe to call whether or not authentication succeeded.
#[async_trait]
pub trait JobSource: Send {
    fn name(&self) -> &'static str;

    async fn authenticate(&mut self, credentials: Credentials) -> Result<(), PipelineError>;

    /// Fetch at most `search.limit` postings. A posting that cannot be read is
    /// skipped; only a failure of the search itself is an error.
    async fn acquire(&mut self, search: &JobSearch) -> Result<Vec<RawJobRecord>, PipelineError>;

    async fn release(&mut self);
}

pub fn source_for(config: &ScraperConfig) -> Box<dyn JobSource> {
    match config.source {
        SourceKind::Browser => Box::new(BrowserJobSource::new(config.browser.clone())),
        SourceKind::Api => Box::new(ApiJobSource::new(config.api.clone())),
    }
}
