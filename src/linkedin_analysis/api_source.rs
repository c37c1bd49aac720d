// src/linkedin_analysis/api_source.rs
use super::normalizer::normalize_description;
use super::voyager_client::{JobBoardApi, VoyagerClient};
use super::JobSource;
use crate::config::{ApiSettings, Credentials};
use crate::error::PipelineError;
use crate::types::{JobSearch, RawDescription, RawJobRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Numeric posting id at the end of an `entityUrn` such as `urn:li:fsd_jobPosting:3812345`.
pub fn job_id_from_urn(urn: &str) -> Result<&str> {
    let id = urn.rsplit(':').next().unwrap_or_default();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        anyhow::bail!("Malformed job identifier: {:?}", urn);
    }
    Ok(id)
}

/// Company name from a job posting: the resolved company, else the free-text name.
fn company_name(job: &Value) -> Option<String> {
    let details = job.get("companyDetails")?.as_object()?;
    details.values().find_map(|detail| {
        detail
            .pointer("/companyResolutionResult/name")
            .or_else(|| detail.get("companyName"))
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

pub fn record_from_posting(job: &Value) -> RawJobRecord {
    let description = match job.get("description") {
        None | Some(Value::Null) => None,
        Some(value) => Some(RawDescription::from(value.clone())),
    };

    RawJobRecord {
        title: job.get("title").and_then(Value::as_str).map(str::to_string),
        company: company_name(job)
            .or_else(|| job.get("companyName").and_then(Value::as_str).map(str::to_string)),
        description,
    }
}

/// Search, then look each of the first `limit` hits up individually.
pub async fn fetch_postings<A: JobBoardApi + ?Sized>(
    api: &A,
    search: &JobSearch,
) -> Result<Vec<RawJobRecord>, PipelineError> {
    info!(
        "Searching jobs for {} in {} (limit {})",
        search.query, search.location, search.limit
    );
    let hits = api
        .search_jobs(search)
        .await
        .map_err(PipelineError::acquisition)?;
    info!("Search returned {} job listings", hits.len());

    let mut jobs = Vec::new();
    for (index, hit) in hits.iter().take(search.limit).enumerate() {
        match fetch_posting(api, hit).await {
            Ok(job) if normalize_description(job.description.as_ref()).is_some() => {
                debug!("Fetched job {}: {:?}", index + 1, job.title);
                jobs.push(job);
            }
            Ok(_) => info!("Skipping job {}: no description", index + 1),
            Err(e) => warn!("Skipping job {}: {:#}", index + 1, e),
        }
    }

    Ok(jobs)
}

async fn fetch_posting<A: JobBoardApi + ?Sized>(api: &A, hit: &Value) -> Result<RawJobRecord> {
    let urn = hit
        .get("entityUrn")
        .and_then(Value::as_str)
        .context("Search hit has no entityUrn")?;
    let job_id = job_id_from_urn(urn)?;

    let posting = api.get_job(job_id).await?;
    Ok(record_from_posting(&posting))
}

pub struct ApiJobSource {
    settings: ApiSettings,
    client: Option<VoyagerClient>,
}

impl ApiJobSource {
    pub fn new(settings: ApiSettings) -> Self {
        Self {
            settings,
            client: None,
        }
    }
}

#[async_trait]
impl JobSource for ApiJobSource {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn authenticate(&mut self, credentials: Credentials) -> Result<(), PipelineError> {
        self.client = Some(VoyagerClient::login(&credentials, &self.settings).await?);
        Ok(())
    }

    async fn acquire(&mut self, search: &JobSearch) -> Result<Vec<RawJobRecord>, PipelineError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| PipelineError::Acquisition("API session not established".to_string()))?;

        fetch_postings(client, search).await
    }

    async fn release(&mut self) {
        if self.client.take().is_some() {
            debug!("Voyager session dropped");
        }
    }
}
