// src/linkedin_analysis/skill_extractor.rs
use super::model_client::LanguageModel;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub const INVALID_FORMAT_SENTINEL: &str = "Error: Invalid skills format";
pub const EXTRACTION_FAILED_SENTINEL: &str = "Error: Could not extract skills";

/// Result of extracting skills for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillOutcome {
    Extracted(Vec<String>),
    /// The model answered with valid JSON that was not a list
    InvalidFormat,
    /// The model call failed or its answer was not JSON
    Failed(String),
}

impl SkillOutcome {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, SkillOutcome::Extracted(_))
    }

    /// Skills as written to the output, with failures collapsed to a sentinel entry.
    pub fn into_skills(self) -> Vec<String> {
        match self {
            SkillOutcome::Extracted(skills) => skills,
            SkillOutcome::InvalidFormat => vec![INVALID_FORMAT_SENTINEL.to_string()],
            SkillOutcome::Failed(_) => vec![EXTRACTION_FAILED_SENTINEL.to_string()],
        }
    }
}

pub fn build_prompt(description: &str) -> String {
    format!(
        r#"Extract required technical and soft skills from this job description.
Return only a JSON list: ["Skill1", "Skill2", "Skill3"]

Job Description:
{}"#,
        description
    )
}

pub struct SkillExtractor {
    model: Arc<dyn LanguageModel>,
}

impl SkillExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// One model call per description; never returns an error.
    pub async fn extract(&self, description: &str) -> SkillOutcome {
        let response = match self.model.generate(&build_prompt(description)).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Error extracting skills: {:#}", e);
                return SkillOutcome::Failed(format!("{:#}", e));
            }
        };

        let outcome = parse_skills(&response);
        if let SkillOutcome::Failed(reason) = &outcome {
            warn!("Error extracting skills: {}", reason);
        }
        outcome
    }

    pub async fn extract_skills(&self, description: &str) -> Vec<String> {
        self.extract(description).await.into_skills()
    }
}

/// Interpret raw model output as a JSON list of skills.
pub fn parse_skills(response: &str) -> SkillOutcome {
    let payload = strip_code_fence(response.trim());

    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(items)) => {
            debug!("Model returned {} skills", items.len());
            SkillOutcome::Extracted(items.into_iter().map(skill_text).collect())
        }
        Ok(_) => SkillOutcome::InvalidFormat,
        Err(e) => SkillOutcome::Failed(format!("response is not JSON: {}", e)),
    }
}

fn skill_text(item: Value) -> String {
    match item {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Models often wrap JSON in ```json fences despite being told not to.
/// Unwrapping them is more lenient than a strict parse of the trimmed reply,
/// which would turn a fenced list into the "Could not extract skills" marker.
fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return text;
    };
    // drop the info string (e.g. "json") on the opening line
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}
