/*!
 * End-to-end tests for single file localization jobs
 */

use std::fs;
use std::sync::Arc;

use weebanizer::app_config::{Config, ProcessingMode};
use weebanizer::demux::Track;
use weebanizer::localization::{HonorificSource, Job, JobState, LocalizationPipeline, NormalizeOutcome};
use weebanizer::providers::mock::MockProvider;
use weebanizer::providers::Provider;
use weebanizer::subtitle_processor::SubtitleCollection;

use crate::common::{self, FixtureDemuxer};

fn pipeline(demuxer: Arc<FixtureDemuxer>, oracle: Option<Arc<dyn Provider>>) -> LocalizationPipeline {
    LocalizationPipeline::new(Arc::new(Config::default()), demuxer, oracle).unwrap()
}

fn texts(path: &std::path::Path) -> Vec<String> {
    SubtitleCollection::load(path, "spa")
        .unwrap()
        .entries
        .into_iter()
        .map(|e| e.text)
        .collect()
}

#[tokio::test]
async fn test_multiMode_withEmbeddedTracks_shouldBlankCreditsAndAddHonorific() {
    common::init_logger();
    let dir = common::create_temp_dir().unwrap();
    let container = dir.path().join("episode.mkv");
    let demuxer = Arc::new(FixtureDemuxer::standard());

    let report = pipeline(demuxer.clone(), None)
        .run_job(&Job::new(&container, ProcessingMode::Multi), None)
        .await;

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(demuxer.extracted(), vec![2, 3, 4]);
    assert_eq!(report.stats.honorific_source, Some(HonorificSource::English));
    assert_eq!(report.stats.transfer.lines_rewritten, 1);
    assert_eq!(texts(&dir.path().join("episode.ass")), vec!["".to_string(), "Hola Alice-san".to_string()]);
}

#[tokio::test]
async fn test_extraMode_withAssSideFile_shouldKeepStylingAndBackUpOriginal() {
    let dir = common::create_temp_dir().unwrap();
    let container = dir.path().join("episode.mkv");
    common::create_test_file(dir.path(), "episode.ass", common::SPANISH_ASS).unwrap();
    let demuxer = Arc::new(FixtureDemuxer::standard());

    let report = pipeline(demuxer.clone(), None)
        .run_job(&Job::new(&container, ProcessingMode::Extra), None)
        .await;

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(demuxer.extracted(), vec![3, 4]);

    let backup = dir.path().join("episode_original.ass");
    assert_eq!(fs::read_to_string(&backup).unwrap(), common::SPANISH_ASS);
    assert_eq!(report.working_copy.map(|c| c.path), Some(backup));

    let output = fs::read_to_string(dir.path().join("episode.ass")).unwrap();
    assert!(output.contains("Style: Default,Arial,20"));
    assert!(output.contains(",,Hola Alice-san, ¿cómo estás?"));
    assert!(!output.contains("Traducción"));
}

#[tokio::test]
async fn test_rerun_withSideFile_shouldReuseBackupAndProduceSameOutput() {
    let dir = common::create_temp_dir().unwrap();
    let container = dir.path().join("episode.mkv");
    common::create_test_file(dir.path(), "episode.ass", common::SPANISH_ASS).unwrap();
    let pipeline = pipeline(Arc::new(FixtureDemuxer::standard()), None);
    let job = Job::new(&container, ProcessingMode::Extra);

    let first = pipeline.run_job(&job, None).await;
    let first_output = fs::read_to_string(dir.path().join("episode.ass")).unwrap();
    let second = pipeline.run_job(&job, None).await;
    let second_output = fs::read_to_string(dir.path().join("episode.ass")).unwrap();

    assert!(first.is_success() && second.is_success());
    assert!(second.working_copy.unwrap().reused);
    assert_eq!(first_output, second_output);
    assert_eq!(fs::read_to_string(dir.path().join("episode_original.ass")).unwrap(), common::SPANISH_ASS);
}

#[tokio::test]
async fn test_unreadableContainer_withoutSideFile_shouldFailWhileSelecting() {
    let dir = common::create_temp_dir().unwrap();
    let container = dir.path().join("broken.mkv");
    let demuxer = Arc::new(FixtureDemuxer::standard().failing_identify());

    let report = pipeline(demuxer, None)
        .run_job(&Job::new(&container, ProcessingMode::Multi), None)
        .await;

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(report.failed_in, Some(JobState::Selecting));
    assert!(!dir.path().join("broken.ass").exists());
}

#[tokio::test]
async fn test_unreadableContainer_withSideFile_shouldStillScrubCredits() {
    let dir = common::create_temp_dir().unwrap();
    let container = dir.path().join("broken.mkv");
    common::create_test_file(dir.path(), "broken.srt", common::SPANISH_SRT).unwrap();
    let demuxer = Arc::new(FixtureDemuxer::standard().failing_identify());

    let report = pipeline(demuxer, None)
        .run_job(&Job::new(&container, ProcessingMode::Multi), None)
        .await;

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.stats.honorific_source, None);
    assert!(dir.path().join("broken_original.srt").exists());
    assert_eq!(texts(&dir.path().join("broken.ass")), vec!["".to_string(), "Hola Alice".to_string()]);
}

#[tokio::test]
async fn test_unparsableSpanishTrack_shouldFailWithoutOutput() {
    let dir = common::create_temp_dir().unwrap();
    let container = dir.path().join("episode.mkv");
    let demuxer = Arc::new(FixtureDemuxer::new().with_track(Track::subtitle(2, "spa", "es", "Spanish"), "garbage"));

    let report = pipeline(demuxer, None)
        .run_job(&Job::new(&container, ProcessingMode::Multi), None)
        .await;

    assert!(!report.is_success());
    assert!(report.error.unwrap().starts_with("Failed to load Spanish subtitle"));
    assert!(!dir.path().join("episode.ass").exists());
}

#[tokio::test]
async fn test_withFailingOracle_shouldStillSaveOtherStages() {
    let dir = common::create_temp_dir().unwrap();
    let container = dir.path().join("episode.mkv");
    let oracle: Arc<dyn Provider> = Arc::new(MockProvider::failing());
    let demuxer = Arc::new(
        FixtureDemuxer::new()
            .with_track(
                Track::subtitle(2, "spa", "es", "Spanish"),
                "1\n00:00:01,000 --> 00:00:02,000\nTraducción: X\n\n2\n00:00:02,000 --> 00:00:03,000\nHola Alice Liddell\n",
            )
            .with_track(Track::subtitle(3, "eng", "en", "English"), common::ENGLISH_SRT),
    );

    let report = pipeline(demuxer, Some(oracle))
        .run_job(&Job::new(&container, ProcessingMode::Multi), None)
        .await;

    assert!(report.is_success(), "{:?}", report.error);
    assert!(matches!(report.stats.names, NormalizeOutcome::OracleFailed(_)));
    assert_eq!(texts(&dir.path().join("episode.ass"))[1], "Hola Alice-san Liddell");
}
