// src/pipeline.rs
use crate::config::{Credentials, ScraperConfig};
use crate::core::FsOps;
use crate::error::PipelineError;
use crate::linkedin_analysis::{
    normalize_job, source_for, GeminiClient, JobSource, LanguageModel, SkillExtractor,
};
use crate::types::{JobSearch, NormalizedJob, ProcessedJob};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        path: PathBuf,
        jobs: usize,
        /// Jobs whose skills are an error marker rather than real skills
        degraded: usize,
    },
    /// Acquisition yielded nothing usable; no file was written.
    NoJobsCollected,
}

/// Authenticate, acquire, extract and persist, in that order, once.
pub struct Pipeline {
    source: Box<dyn JobSource>,
    extractor: SkillExtractor,
    search: JobSearch,
    output_path: PathBuf,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn JobSource>,
        model: Arc<dyn LanguageModel>,
        search: JobSearch,
        output_path: PathBuf,
    ) -> Self {
        Self {
            source,
            extractor: SkillExtractor::new(model),
            search,
            output_path,
        }
    }

    pub fn from_config(config: &ScraperConfig, credentials: &Credentials) -> Result<Self> {
        let model = GeminiClient::new(credentials.model_api_key.clone(), &config.model)?;

        Ok(Self::new(
            source_for(config),
            Arc::new(model),
            JobSearch::new(config.query.clone(), config.location.clone(), config.limit),
            config.output_path.clone(),
        ))
    }

    /// Run every stage. The session is released on every path once authentication starts.
    pub async fn run(mut self, credentials: Credentials) -> Result<RunOutcome, PipelineError> {
        info!("Starting run with the {} source", self.source.name());

        let result = self.run_stages(credentials).await;
        self.source.release().await;

        match &result {
            Ok(RunOutcome::Completed { path, jobs, degraded }) => info!(
                "Process completed: {} jobs ({} without skills) saved to {}",
                jobs,
                degraded,
                path.display()
            ),
            Ok(RunOutcome::NoJobsCollected) => warn!("No jobs collected; nothing written"),
            Err(e) => warn!("Run failed: {}", e),
        }
        result
    }

    async fn run_stages(&mut self, credentials: Credentials) -> Result<RunOutcome, PipelineError> {
        self.source.authenticate(credentials).await?;

        let raw = self.source.acquire(&self.search).await?;
        let jobs: Vec<NormalizedJob> = raw
            .iter()
            .filter_map(normalize_job)
            .take(self.search.limit)
            .collect();

        if jobs.is_empty() {
            return Ok(RunOutcome::NoJobsCollected);
        }

        info!("Extracting skills from {} job descriptions", jobs.len());
        let (processed, degraded) = self.extract_all(jobs).await;

        FsOps::write_results(&self.output_path, &processed).await?;

        Ok(RunOutcome::Completed {
            path: self.output_path.clone(),
            jobs: processed.len(),
            degraded,
        })
    }

    async fn extract_all(&self, jobs: Vec<NormalizedJob>) -> (Vec<ProcessedJob>, usize) {
        let total = jobs.len();
        let mut processed = Vec::with_capacity(total);
        let mut degraded = 0;

        for (index, job) in jobs.into_iter().enumerate() {
            info!(
                "Processing job {}/{}: {} at {}",
                index + 1,
                total,
                job.title,
                job.company
            );
            let outcome = self.extractor.extract(&job.description).await;
            if outcome.is_degraded() {
                degraded += 1;
            }
            processed.push(ProcessedJob {
                title: job.title,
                company: job.company,
                skills: outcome.into_skills(),
            });
        }

        (processed, degraded)
    }
}
