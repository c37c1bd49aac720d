// src/linkedin_analysis/voyager_client.rs
//! Minimal client for LinkedIn's Voyager JSON API

use super::types::LoginResponse;
use crate::config::{ApiSettings, Credentials};
use crate::error::PipelineError;
use crate::types::JobSearch;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info};
use url::form_urlencoded;

const AUTHENTICATE_ENDPOINT: &str = "/uas/authenticate";
const JOB_CARDS_ENDPOINT: &str = "/voyager/api/voyagerJobsDashJobCards";
const JOB_POSTING_ENDPOINT: &str = "/voyager/api/jobs/jobPostings";

const JOB_CARDS_DECORATION: &str =
    "com.linkedin.voyager.dash.deco.jobs.search.JobSearchCardsCollection-174";
const JOB_POSTING_DECORATION: &str =
    "com.linkedin.voyager.deco.jobs.web.shared.WebFullJobPosting-65";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const LI_USER_AGENT: &str = "LIAuthLibrary:3.2.4 com.linkedin.LinkedIn:8.8.1 iPhone:8.3";

/// Search and detail lookups against a job board.
#[async_trait]
pub trait JobBoardApi: Send + Sync {
    /// Raw search hits; each is expected to carry an `entityUrn`.
    async fn search_jobs(&self, search: &JobSearch) -> Result<Vec<Value>>;

    async fn get_job(&self, job_id: &str) -> Result<Value>;
}

pub struct VoyagerClient {
    client: Client,
    base_url: String,
    csrf_token: String,
}

impl VoyagerClient {
    /// Run the Voyager login handshake and return a client bound to the session cookies.
    pub async fn login(credentials: &Credentials, settings: &ApiSettings) -> Result<Self, PipelineError> {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(PipelineError::authentication)?;

        let url = format!("{}{}", base_url, AUTHENTICATE_ENDPOINT);
        info!("Authenticating against {}", url);

        let bootstrap = client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::Authentication(format!("failed to reach LinkedIn: {}", e)))?;

        let csrf_token = bootstrap
            .cookies()
            .find(|cookie| cookie.name() == "JSESSIONID")
            .map(|cookie| cookie.value().trim_matches('"').to_string())
            .ok_or_else(|| {
                PipelineError::Authentication("LinkedIn did not issue a JSESSIONID cookie".to_string())
            })?;

        let response = client
            .post(&url)
            .header("csrf-token", &csrf_token)
            .header("X-Li-User-Agent", LI_USER_AGENT)
            .header("X-User-Language", "en")
            .header("X-Restli-Protocol-Version", "2.0.0")
            .form(&[
                ("session_key", credentials.identity.as_str()),
                ("session_password", credentials.secret.as_str()),
                ("JSESSIONID", csrf_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PipelineError::Authentication(format!("login request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PipelineError::Authentication(
                "LinkedIn rejected the credentials".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(PipelineError::Authentication(format!(
                "login returned HTTP {}",
                status
            )));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Authentication(format!("unexpected login response: {}", e)))?;

        if login.login_result != "PASS" {
            return Err(PipelineError::Authentication(format!(
                "login result was {}",
                login.login_result
            )));
        }

        info!("Voyager session established");
        Ok(Self {
            client,
            base_url,
            csrf_token,
        })
    }

    async fn get(&self, path_and_query: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("csrf-token", &self.csrf_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .header("Accept", "application/vnd.linkedin.normalized+json+2.1")
            .send()
            .await
            .with_context(|| format!("Failed to GET {}", url))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<Value>()
                .await
                .context("Failed to parse Voyager response")
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("HTTP {} error: {}", status, error_text)
        }
    }
}

/// Percent-encode a value for a Rest.li query, spaces as `%20`.
fn restli_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Posting id of a `urn:li:fsd_jobPosting:<id>` URN. Job cards and other
/// entities in `included` (`fsd_jobPostingCard`, `fsd_company`) yield `None`.
pub fn job_posting_id(urn: &str) -> Option<&str> {
    let (kind, id) = urn.rsplit_once(':')?;
    if kind.ends_with("jobPosting") && !id.is_empty() {
        Some(id)
    } else {
        None
    }
}

pub fn job_cards_query(search: &JobSearch) -> String {
    format!(
        "{}?decorationId={}&count={}&q=jobSearch&query=(origin:JOB_SEARCH_PAGE_QUERY_EXPANSION,keywords:{},locationFallback:{},spellCorrectionEnabled:true)&start=0",
        JOB_CARDS_ENDPOINT,
        JOB_CARDS_DECORATION,
        search.limit,
        restli_encode(&search.query),
        restli_encode(&search.location),
    )
}

#[async_trait]
impl JobBoardApi for VoyagerClient {
    async fn search_jobs(&self, search: &JobSearch) -> Result<Vec<Value>> {
        let body = self.get(&job_cards_query(search)).await?;

        let mut seen = HashSet::new();
        let postings = body
            .get("included")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| {
                        item.get("entityUrn")
                            .and_then(Value::as_str)
                            .and_then(job_posting_id)
                            .map_or(false, |id| seen.insert(id.to_string()))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(postings)
    }

    async fn get_job(&self, job_id: &str) -> Result<Value> {
        self.get(&format!(
            "{}/{}?decorationId={}",
            JOB_POSTING_ENDPOINT, job_id, JOB_POSTING_DECORATION
        ))
        .await
        .with_context(|| format!("Failed to fetch job {}", job_id))
    }
}
