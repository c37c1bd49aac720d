// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_OUTPUT_FILE: &str = "linkedin_jobs.json";

pub const IDENTITY_VAR: &str = "LINKEDIN_EMAIL";
pub const SECRET_VAR: &str = "LINKEDIN_PASSWORD";
pub const MODEL_API_KEY_VAR: &str = "GEMINI_API_KEY";

// ===== Credentials =====

#[derive(Clone)]
pub struct Credentials {
    pub identity: String,
    pub secret: String,
    pub model_api_key: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from any variable source, reporting every missing name at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let identity = read(IDENTITY_VAR);
        let secret = read(SECRET_VAR);
        let model_api_key = read(MODEL_API_KEY_VAR);

        match (identity, secret, model_api_key) {
            (Some(identity), Some(secret), Some(model_api_key)) => Ok(Self {
                identity,
                secret,
                model_api_key,
            }),
            (identity, secret, model_api_key) => {
                let missing: Vec<&str> = [
                    (IDENTITY_VAR, identity.is_none()),
                    (SECRET_VAR, secret.is_none()),
                    (MODEL_API_KEY_VAR, model_api_key.is_none()),
                ]
                .iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| *name)
                .collect();
                anyhow::bail!(
                    "Missing environment variables: {}. Set them before starting the scraper.",
                    missing.join(", ")
                )
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"***")
            .field("model_api_key", &"***")
            .finish()
    }
}

// ===== Scraper configuration =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Drive the LinkedIn web UI in a headless Chromium
    Browser,
    /// Talk to the Voyager JSON API directly
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleStrategy {
    /// Sleep for the full interval
    Fixed,
    /// Poll for the expected element, giving up after the interval
    Poll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub login_timeout_secs: u64,
    pub post_login_settle_secs: u64,
    pub search_settle_secs: u64,
    pub detail_settle_secs: u64,
    pub settle_strategy: SettleStrategy,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            login_timeout_secs: 15,
            post_login_settle_secs: 3,
            search_settle_secs: 3,
            detail_settle_secs: 2,
            settle_strategy: SettleStrategy::Fixed,
        }
    }
}

impl BrowserSettings {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn post_login_settle(&self) -> Duration {
        Duration::from_secs(self.post_login_settle_secs)
    }

    pub fn search_settle(&self) -> Duration {
        Duration::from_secs(self.search_settle_secs)
    }

    pub fn detail_settle(&self) -> Duration {
        Duration::from_secs(self.detail_settle_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub name: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.linkedin.com".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub source: SourceKind,
    pub query: String,
    pub location: String,
    pub limit: usize,
    pub output_path: PathBuf,
    pub log_path: Option<PathBuf>,
    pub browser: BrowserSettings,
    pub model: ModelSettings,
    pub api: ApiSettings,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Browser,
            query: "Software Engineer".to_string(),
            location: "Singapore".to_string(),
            limit: 10,
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            log_path: None,
            browser: BrowserSettings::default(),
            model: ModelSettings::default(),
            api: ApiSettings::default(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from `path`, or from `config.yaml` if it exists.
    ///
    /// An explicit path that does not exist is an error; a missing default file
    /// just yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::load_from_file(path)
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from_file(&default_path)
                } else {
                    info!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        if config.limit == 0 {
            anyhow::bail!("limit must be at least 1");
        }
        Ok(config)
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_output_path(mut self, path: PathBuf) -> Self {
        self.output_path = path;
        self
    }

    pub fn with_headed_browser(mut self) -> Self {
        self.browser.headless = false;
        self
    }
}
