// src/linkedin_analysis/model_client.rs
use super::types::{GeminiRequest, GeminiResponse};
use crate::config::ModelSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// A generative model that turns a prompt into raw text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, settings: &ModelSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.name.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Sending prompt to Gemini model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&GeminiRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error {}: {}", status, error_text);
            anyhow::bail!("Gemini API returned error {}: {}", status, error_text);
        }

        let body: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        body.first_text()
            .map(str::to_string)
            .context("Gemini response contained no text")
    }
}
