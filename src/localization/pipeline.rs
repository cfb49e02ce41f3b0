/*!
 * Per-container localization job.
 *
 * A job obtains the Spanish working copy (external side file or embedded
 * track), extracts the English and Malay tracks into a temporary directory,
 * then runs credit scrubbing, honorific transfer and name normalization
 * before writing `<stem>.ass` next to the container. Only a missing or
 * unreadable Spanish document and a failed save abort the job.
 */

use anyhow::Result;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{Config, LanguageBucket, ProcessingMode};
use crate::demux::Demuxer;
use crate::errors::PipelineError;
use crate::file_utils::{FileManager, WorkingCopy};
use crate::providers::Provider;
use crate::subtitle_processor::SubtitleCollection;

use super::credits::CreditScrubber;
use super::honorifics::{HonorificSource, HonorificTransfer, TransferStats};
use super::names::{NameNormalizer, NormalizeOutcome};
use super::track_scorer::{TrackScorer, TrackSelection};

/// One container to localize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub container: PathBuf,
    pub mode: ProcessingMode,
}

impl Job {
    pub fn new(container: impl Into<PathBuf>, mode: ProcessingMode) -> Self {
        Self {
            container: container.into(),
            mode,
        }
    }
}

/// Where a job currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Selecting,
    Scrubbing,
    Transferring,
    Normalizing,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Selecting => "selecting tracks",
            Self::Scrubbing => "removing credits",
            Self::Transferring => "transferring honorifics",
            Self::Normalizing => "normalizing names",
            Self::Persisting => "saving",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Progress notification sent to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub state: JobState,
    /// 0 to 100, never decreasing within a job
    pub percent: u8,
    pub message: String,
}

/// Receives progress notifications while a job runs
pub type ProgressCallback = Box<dyn Fn(JobProgress) + Send + Sync>;

/// What each processing stage did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageStats {
    pub credits_blanked: usize,
    /// None when neither English nor Malay was usable
    pub honorific_source: Option<HonorificSource>,
    pub transfer: TransferStats,
    pub names: NormalizeOutcome,
}

/// Outcome of one job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub container: PathBuf,
    pub mode: ProcessingMode,
    /// Either `Done` or `Failed`
    pub state: JobState,
    /// Stage that was running when the job failed
    pub failed_in: Option<JobState>,
    pub error: Option<String>,
    /// Written `<stem>.ass`, set on success
    pub output: Option<PathBuf>,
    /// External subtitle backup, when one was used
    pub working_copy: Option<WorkingCopy>,
    pub selection: TrackSelection,
    pub stats: StageStats,
    pub elapsed: Duration,
}

impl JobReport {
    fn new(job: &Job) -> Self {
        Self {
            container: job.container.clone(),
            mode: job.mode,
            state: JobState::Selecting,
            failed_in: None,
            error: None,
            output: None,
            working_copy: None,
            selection: TrackSelection::default(),
            stats: StageStats::default(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == JobState::Done
    }
}

/// Tracks the running state and forwards progress to the callback
struct Reporter<'a> {
    callback: Option<&'a ProgressCallback>,
    state: JobState,
    percent: u8,
}

impl<'a> Reporter<'a> {
    fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            callback,
            state: JobState::Selecting,
            percent: 0,
        }
    }

    fn enter(&mut self, state: JobState, message: impl Into<String>) {
        self.state = state;
        let percent = self.percent;
        self.emit(percent, message);
    }

    fn emit(&mut self, percent: u8, message: impl Into<String>) {
        self.percent = percent.max(self.percent).min(100);
        if let Some(callback) = self.callback {
            callback(JobProgress {
                state: self.state,
                percent: self.percent,
                message: message.into(),
            });
        }
    }
}

/// Runs localization jobs with a shared configuration
pub struct LocalizationPipeline {
    config: Arc<Config>,
    demuxer: Arc<dyn Demuxer>,
    oracle: Option<Arc<dyn Provider>>,
    scrubber: CreditScrubber,
    transfer: HonorificTransfer,
    normalizer: NameNormalizer,
}

impl LocalizationPipeline {
    /// Build the stages once; the oracle is optional
    pub fn new(config: Arc<Config>, demuxer: Arc<dyn Demuxer>, oracle: Option<Arc<dyn Provider>>) -> Result<Self> {
        let scrubber = CreditScrubber::new(&config.credit_labels)?;
        let transfer = HonorificTransfer::new(&config.honorifics)?;
        let normalizer = NameNormalizer::new(config.oracle.name_inversion_prompt.clone());

        Ok(Self {
            config,
            demuxer,
            oracle,
            scrubber,
            transfer,
            normalizer,
        })
    }

    pub fn oracle(&self) -> Option<&dyn Provider> {
        self.oracle.as_deref()
    }

    /// Run one job to completion; failures are reported, never returned
    pub async fn run_job(&self, job: &Job, progress: Option<&ProgressCallback>) -> JobReport {
        let started = Instant::now();
        let mut reporter = Reporter::new(progress);
        let mut report = JobReport::new(job);

        match self.execute(job, &mut reporter, &mut report).await {
            Ok(output) => {
                report.state = JobState::Done;
                report.output = Some(output);
                reporter.enter(JobState::Done, "Finished");
            }
            Err(e) => {
                error!("Failed to process {:?} while {}: {}", job.container, reporter.state, e);
                report.failed_in = Some(reporter.state);
                report.state = JobState::Failed;
                report.error = Some(e.to_string());
                reporter.enter(JobState::Failed, e.to_string());
            }
        }

        report.elapsed = started.elapsed();
        report
    }

    async fn execute(
        &self,
        job: &Job,
        reporter: &mut Reporter<'_>,
        report: &mut JobReport,
    ) -> Result<PathBuf, PipelineError> {
        let container = job.container.as_path();
        reporter.emit(5, format!("Processing {} ({})", display_name(container), job.mode));

        let working_copy = self.prepare_target(job)?;
        report.working_copy = working_copy.clone();

        let tracks = match self.demuxer.identify(container).await {
            Ok(tracks) => tracks,
            Err(e) if working_copy.is_none() => return Err(PipelineError::Selection(e)),
            Err(e) => {
                warn!("Cannot read the tracks of {:?}, continuing without sources: {}", container, e);
                Vec::new()
            }
        };
        reporter.emit(10, format!("Found {} tracks", tracks.len()));

        let selection = TrackScorer::new(&self.config.priority_table).select_best(&tracks);
        for (bucket, pick) in selection.iter() {
            info!(
                "Best {} subtitle: track {} '{}' (language '{}', IETF '{}', score {})",
                bucket, pick.track.id, pick.track.title, pick.track.language, pick.track.language_ietf, pick.score
            );
        }
        report.selection = selection.clone();
        reporter.emit(20, "Tracks selected");

        let mut wanted = vec![LanguageBucket::English, LanguageBucket::Malay];
        if working_copy.is_none() {
            wanted.insert(0, LanguageBucket::Spanish);
        }

        // Extracted files live until the end of this call
        let temp_dir = tempfile::Builder::new().prefix("weebanizer-").tempdir();
        let extracted = match &temp_dir {
            Ok(dir) => {
                self.extract_tracks(container, &selection, &wanted, dir.path(), reporter)
                    .await
            }
            Err(e) => {
                warn!("Cannot create a temporary directory, skipping extraction: {}", e);
                HashMap::new()
            }
        };
        reporter.emit(50, "Extraction finished");

        let target_path = match (&working_copy, extracted.get(&LanguageBucket::Spanish)) {
            (Some(copy), _) => {
                info!("Using external Spanish subtitle {:?}", copy.path);
                copy.path.clone()
            }
            (None, Some(path)) => {
                info!("Using the Spanish track embedded in {}", display_name(container));
                path.clone()
            }
            (None, None) => {
                return Err(PipelineError::MissingTarget(format!(
                    "no external subtitle and no Spanish track in {:?}",
                    container
                )));
            }
        };

        let mut target = SubtitleCollection::load(&target_path, LanguageBucket::Spanish.key())?;
        let english = load_source(extracted.get(&LanguageBucket::English), LanguageBucket::English);
        let malay = load_source(extracted.get(&LanguageBucket::Malay), LanguageBucket::Malay);
        reporter.emit(55, format!("Loaded {} Spanish lines", target.entries.len()));

        reporter.enter(JobState::Scrubbing, "Removing credit lines");
        report.stats.credits_blanked = self.scrub_stage(&mut target);
        reporter.emit(60, format!("Blanked {} credit lines", report.stats.credits_blanked));

        reporter.enter(JobState::Transferring, "Transferring honorifics");
        let (source, transfer) = self.transfer_stage(&mut target, english.as_ref(), malay.as_ref());
        report.stats.honorific_source = source;
        report.stats.transfer = transfer;
        reporter.emit(80, format!("Rewrote {} lines", report.stats.transfer.lines_rewritten));

        reporter.enter(JobState::Normalizing, "Normalizing names");
        report.stats.names = self.normalize_stage(&mut target).await;
        reporter.emit(90, "Names checked");

        reporter.enter(JobState::Persisting, "Saving");
        let output = FileManager::output_path(container);
        FileManager::write_atomically(&output, &target.to_ass_string()).map_err(|e| PipelineError::Persist {
            path: output.clone(),
            message: format!("{:#}", e),
        })?;
        info!("Saved {:?}", output);
        reporter.emit(100, "Saved");

        if let Ok(dir) = temp_dir {
            if let Err(e) = dir.close() {
                debug!("Failed to remove temporary files: {}", e);
            }
        }

        Ok(output)
    }

    /// Run the processing stages on documents already in memory
    pub async fn process_documents(
        &self,
        target: &mut SubtitleCollection,
        english: Option<&SubtitleCollection>,
        malay: Option<&SubtitleCollection>,
    ) -> StageStats {
        let credits_blanked = self.scrub_stage(target);
        let (honorific_source, transfer) = self.transfer_stage(target, english, malay);
        let names = self.normalize_stage(target).await;

        StageStats {
            credits_blanked,
            honorific_source,
            transfer,
            names,
        }
    }

    /// External working copy, or None when the embedded track must be used
    fn prepare_target(&self, job: &Job) -> Result<Option<WorkingCopy>, PipelineError> {
        match (FileManager::prepare_working_copy(&job.container), job.mode) {
            (Ok(Some(copy)), _) => {
                if copy.reused {
                    info!("Reusing backup {:?} from an earlier run", copy.path);
                }
                Ok(Some(copy))
            }
            (Ok(None), ProcessingMode::Extra) => Err(PipelineError::MissingTarget(format!(
                "extra-sub mode needs {:?} or a .srt next to the container",
                FileManager::output_path(&job.container)
            ))),
            (Ok(None), ProcessingMode::Multi) => Ok(None),
            (Err(e), ProcessingMode::Extra) => Err(PipelineError::SideFile {
                path: FileManager::output_path(&job.container),
                message: e.to_string(),
            }),
            (Err(e), ProcessingMode::Multi) => {
                warn!("Failed to back up the external subtitle, using the embedded track: {}", e);
                Ok(None)
            }
        }
    }

    async fn extract_tracks(
        &self,
        container: &Path,
        selection: &TrackSelection,
        wanted: &[LanguageBucket],
        dir: &Path,
        reporter: &mut Reporter<'_>,
    ) -> HashMap<LanguageBucket, PathBuf> {
        let stem = container.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let picks: Vec<_> = wanted
            .iter()
            .filter_map(|bucket| selection.get(*bucket).map(|pick| (*bucket, pick)))
            .collect();

        let mut extracted = HashMap::new();
        if picks.is_empty() {
            return extracted;
        }

        let step = (30 / picks.len()) as u8;
        let mut percent = 20;
        for (bucket, pick) in picks {
            let output = dir.join(format!("{}_{}.{}", stem, bucket.key(), pick.track.file_extension()));
            match self.demuxer.extract(container, pick.track.id, &output).await {
                Ok(()) => {
                    debug!("Extracted {} track {} to {:?}", bucket, pick.track.id, output);
                    extracted.insert(bucket, output);
                }
                Err(e) => warn!("Failed to extract {} track {}: {}", bucket, pick.track.id, e),
            }
            percent += step;
            reporter.emit(percent, format!("Extracted {} subtitles", bucket));
        }

        extracted
    }

    fn scrub_stage(&self, target: &mut SubtitleCollection) -> usize {
        let blanked = self.scrubber.scrub(target);
        info!("Blanked {} credit lines", blanked);
        blanked
    }

    fn transfer_stage(
        &self,
        target: &mut SubtitleCollection,
        english: Option<&SubtitleCollection>,
        malay: Option<&SubtitleCollection>,
    ) -> (Option<HonorificSource>, TransferStats) {
        match self.transfer.choose_source(english, malay) {
            Some((source, document)) => {
                info!("Transferring honorifics from the {} subtitles", source);
                let stats = self.transfer.transfer(document, target);
                info!(
                    "Honorifics: {} source lines with suffixes, {} Spanish lines rewritten, {} unmatched",
                    stats.lines_with_honorifics, stats.lines_rewritten, stats.misses
                );
                (Some(source), stats)
            }
            None => {
                info!("No English or Malay subtitles available, only credits were removed");
                (None, TransferStats::default())
            }
        }
    }

    async fn normalize_stage(&self, target: &mut SubtitleCollection) -> NormalizeOutcome {
        match &self.oracle {
            Some(oracle) => self.normalizer.normalize(target, oracle.as_ref()).await,
            None => {
                debug!("No name oracle configured, skipping name normalization");
                NormalizeOutcome::Disabled
            }
        }
    }
}

/// Parsed source document, or None with a warning
fn load_source(path: Option<&PathBuf>, bucket: LanguageBucket) -> Option<SubtitleCollection> {
    let path = path?;
    match SubtitleCollection::load(path, bucket.key()) {
        Ok(document) => Some(document),
        Err(e) => {
            warn!("Ignoring unreadable {} subtitles: {}", bucket, e);
            None
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
