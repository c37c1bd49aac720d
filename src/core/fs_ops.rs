// src/core/fs_ops.rs
//! Result file persistence

use crate::error::PipelineError;
use crate::types::ProcessedJob;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

pub struct FsOps;

impl FsOps {
    pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
            info!("Created directory: {}", path.display());
        }
        Ok(())
    }

    /// Write `content` beside `path` and rename it into place, replacing any existing file.
    pub async fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir_exists(parent).await?;
        }

        let staging = staging_path(path);
        fs::write(&staging, content)
            .await
            .with_context(|| format!("Failed to write file: {}", staging.display()))?;

        if let Err(e) = fs::rename(&staging, path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e).with_context(|| format!("Failed to replace file: {}", path.display()));
        }
        Ok(())
    }

    /// Serialize every processed job as one pretty-printed JSON array.
    pub async fn write_results(path: &Path, jobs: &[ProcessedJob]) -> Result<(), PipelineError> {
        let persistence = |reason: String| PipelineError::Persistence {
            path: path.to_path_buf(),
            reason,
        };

        let json = serde_json::to_string_pretty(jobs).map_err(|e| persistence(e.to_string()))?;
        Self::write_file_atomic(path, &json)
            .await
            .map_err(|e| persistence(format!("{:#}", e)))?;

        info!("Wrote {} jobs to {}", jobs.len(), path.display());
        Ok(())
    }

    pub async fn read_results(path: &Path) -> Result<Vec<ProcessedJob>> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse results in {}", path.display()))
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
