use anyhow::{Context, Result};
use clap::Parser;
use job_skills::{Credentials, Pipeline, RunOutcome, ScraperConfig, SourceKind};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::{info, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "jobskills")]
#[command(about = "Collect LinkedIn job postings and extract the skills they require")]
struct Cli {
    /// Configuration file (defaults to ./config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// How to reach LinkedIn
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// Maximum number of postings to process
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,

    /// Output file for the JSON results
    #[arg(long)]
    output: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Stderr-only logging for the messages emitted before the log file is known.
fn bootstrap_subscriber() -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
}

fn init_logging(log_path: Option<&PathBuf>) -> Result<()> {
    let filter = env_filter();

    let file_layer = match log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .json()
                    .with_writer(file)
                    .with_current_span(false)
                    .with_span_list(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Build the configuration with `subscriber` collecting whatever loading logs.
fn load_config<S>(cli: &Cli, subscriber: S) -> Result<ScraperConfig>
where
    S: Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::with_default(subscriber, || build_config(cli))
}

fn build_config(cli: &Cli) -> Result<ScraperConfig> {
    let mut config = ScraperConfig::load(cli.config.as_deref())?;
    if let Some(source) = cli.source {
        config = config.with_source(source);
    }
    if let Some(limit) = cli.limit {
        config = config.with_limit(limit as usize);
    }
    if let Some(output) = &cli.output {
        config = config.with_output_path(output.clone());
    }
    if cli.headed {
        config = config.with_headed_browser();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli, bootstrap_subscriber())?;
    init_logging(config.log_path.as_ref())?;

    let credentials = Credentials::from_env()?;

    info!(
        "Searching {} jobs in {} (limit {})",
        config.query, config.location, config.limit
    );

    let pipeline = Pipeline::from_config(&config, &credentials)?;
    match pipeline.run(credentials).await? {
        RunOutcome::Completed { path, jobs, .. } => {
            info!("Results saved to {} ({} jobs)", path.display(), jobs);
        }
        RunOutcome::NoJobsCollected => {
            info!("No jobs collected; {} was not written", config.output_path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_loading_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("scraper.yaml");
        std::fs::write(&config_path, "limit: 4\n").unwrap();

        let cli = Cli::parse_from([
            "jobskills",
            "--config",
            config_path.to_str().unwrap(),
            "--source",
            "api",
        ]);

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(move || writer.clone()),
        );

        let config = load_config(&cli, subscriber).unwrap();
        assert_eq!(config.limit, 4);
        assert_eq!(config.source, SourceKind::Api);

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Loading configuration from"));
    }
}
