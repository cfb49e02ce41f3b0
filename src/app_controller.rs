use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::demux::{Demuxer, MkvToolnix};
use crate::file_utils::FileManager;
use crate::localization::{Job, JobProgress, JobReport, LocalizationPipeline, ProgressCallback};
use crate::providers::{self, Provider};

// @module: Application controller for batch localization

/// Name of the failure log written next to the processed containers
pub const ISSUES_LOG_FILE: &str = "weebanizer.issues.log";

/// Totals for one batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    /// Inputs that were not `.mkv` files or directories
    pub skipped: usize,
    /// True when Ctrl-C stopped the batch before every job ran
    pub cancelled: bool,
    pub reports: Vec<JobReport>,
    pub duration: Duration,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Arc<Config>,
    // @field: Shared pipeline, built once per run
    pipeline: LocalizationPipeline,
    // @field: Set by the interrupt handler, checked between jobs
    cancelled: Arc<AtomicBool>,
}

impl Controller {
    // @method: Create a controller with the real demuxer and the configured oracle
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let demuxer: Arc<dyn Demuxer> = Arc::new(MkvToolnix::new(&config.tools));
        let oracle = providers::build_provider(&config.oracle);
        Self::with_parts(config, demuxer, oracle)
    }

    /// Create a controller with explicit collaborators
    pub fn with_parts(config: Config, demuxer: Arc<dyn Demuxer>, oracle: Option<Arc<dyn Provider>>) -> Result<Self> {
        let config = Arc::new(config);
        let pipeline = LocalizationPipeline::new(Arc::clone(&config), demuxer, oracle)?;

        Ok(Self {
            config,
            pipeline,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the batch before the next job when set
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Set the cancellation flag on Ctrl-C
    pub fn listen_for_interrupt(&self) {
        let flag = self.cancellation_flag();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current file");
                flag.store(true, Ordering::SeqCst);
            }
        });
    }

    /// Check that the oracle answers; failures only produce a warning
    pub async fn check_oracle(&self) {
        let Some(oracle) = self.pipeline.oracle() else {
            return;
        };
        match oracle.test_connection().await {
            Ok(()) => info!(
                "Name oracle: {} - {}",
                self.config.oracle.provider.display_name(),
                self.config.oracle.get_model()
            ),
            Err(e) => warn!("{} is not reachable, name normalization may fail: {}", oracle.name(), e),
        }
    }

    /// Localize every container found in the inputs, one after another
    pub async fn run(&self, inputs: &[PathBuf]) -> Result<BatchSummary> {
        let start_time = std::time::Instant::now();

        let (containers, skipped) = FileManager::collect_inputs(inputs)?;
        for path in &skipped {
            warn!("Skipping {:?}: not a .mkv file or a directory", path);
        }
        if containers.is_empty() {
            return Err(anyhow!("No .mkv files found in the given inputs"));
        }

        info!(
            "Localizing {} files in {} mode{}",
            containers.len(),
            self.config.mode,
            if self.pipeline.oracle().is_some() { "" } else { " without name normalization" }
        );

        let progress_bar = ProgressBar::new(containers.len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        let mut summary = BatchSummary {
            skipped: skipped.len(),
            ..BatchSummary::default()
        };

        for container in &containers {
            if self.cancelled.load(Ordering::SeqCst) {
                warn!("Batch cancelled, {} files not processed", containers.len() - summary.reports.len());
                summary.cancelled = true;
                break;
            }

            let file_name = container
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            progress_bar.set_message(file_name.clone());

            let pb = progress_bar.clone();
            let label = file_name.clone();
            let callback: ProgressCallback = Box::new(move |p: JobProgress| {
                pb.set_message(format!("{} {}% {}", label, p.percent, p.state));
            });

            let job = Job::new(container.clone(), self.config.mode);
            let report = self.pipeline.run_job(&job, Some(&callback)).await;

            if report.is_success() {
                summary.processed += 1;
                info!("{} done in {}", file_name, Self::format_duration(report.elapsed));
            } else {
                summary.failed += 1;
                self.record_failure(container, &report);
            }

            summary.reports.push(report);
            progress_bar.inc(1);
        }

        progress_bar.finish_with_message("Batch complete");

        summary.duration = start_time.elapsed();
        info!(
            "Batch finished in {}: {} processed, {} failed, {} skipped",
            Self::format_duration(summary.duration),
            summary.processed,
            summary.failed,
            summary.skipped
        );

        Ok(summary)
    }

    // @method: Append a failed job to the issues log next to the container
    fn record_failure(&self, container: &Path, report: &JobReport) {
        let stage = report.failed_in.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string());
        let message = report.error.as_deref().unwrap_or("unknown error");
        error!("{:?} failed while {}: {}", container, stage, message);

        let log_path = container.parent().unwrap_or_else(|| Path::new(".")).join(ISSUES_LOG_FILE);
        let entry = format!("{} failed while {}: {}", container.display(), stage, message);
        if let Err(e) = FileManager::append_to_log_file(&log_path, &entry) {
            warn!("Failed to write {:?}: {}", log_path, e);
        }
    }

    // Format duration in a human-readable format (HH:MM:SS)
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
