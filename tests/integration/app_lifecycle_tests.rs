/*!
 * Integration tests for batch runs through the controller
 */

use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use weebanizer::app_config::Config;
use weebanizer::app_controller::{Controller, ISSUES_LOG_FILE};
use weebanizer::demux::Track;

use crate::common::{self, FixtureDemuxer};

fn controller(demuxer: FixtureDemuxer) -> Controller {
    Controller::with_parts(Config::default(), Arc::new(demuxer), None).unwrap()
}

#[tokio::test]
async fn test_run_withDirectoryAndStrayFile_shouldProcessContainersAndSkipOthers() {
    common::init_logger();
    let dir = common::create_temp_dir().unwrap();
    let season = dir.path().join("season");
    common::create_test_file(&season, "ep01.mkv", "").unwrap();
    common::create_test_file(&season, "ep02.mkv", "").unwrap();
    common::create_test_file(&season, "notes.txt", "").unwrap();
    let stray = common::create_test_file(dir.path(), "trailer.mp4", "").unwrap();

    let summary = controller(FixtureDemuxer::standard()).run(&[season.clone(), stray]).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped, 1);
    assert!(!summary.has_failures());
    assert!(season.join("ep01.ass").exists());
    assert!(season.join("ep02.ass").exists());
    assert!(!season.join(ISSUES_LOG_FILE).exists());
}

#[tokio::test]
async fn test_run_withFailingJob_shouldContinueAndWriteIssuesLog() {
    let dir = common::create_temp_dir().unwrap();
    let container = common::create_test_file(dir.path(), "ep01.mkv", "").unwrap();
    let demuxer = FixtureDemuxer::new().with_track(Track::subtitle(3, "eng", "en", "English"), common::ENGLISH_SRT);

    let summary = controller(demuxer).run(&[container]).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert!(summary.has_failures());
    let log = fs::read_to_string(dir.path().join(ISSUES_LOG_FILE)).unwrap();
    assert!(log.contains("ep01.mkv failed while selecting tracks"));
    assert!(log.contains("No Spanish subtitle available"));
}

#[test]
fn test_run_withoutContainers_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    common::create_test_file(dir.path(), "readme.txt", "").unwrap();
    let controller = controller(FixtureDemuxer::standard());

    let result = tokio_test::block_on(controller.run(&[dir.path().to_path_buf()]));

    assert!(result.is_err());
}

#[tokio::test]
async fn test_run_whenCancelled_shouldNotStartJobs() {
    let dir = common::create_temp_dir().unwrap();
    let container = common::create_test_file(dir.path(), "ep01.mkv", "").unwrap();
    let controller = controller(FixtureDemuxer::standard());
    controller.cancellation_flag().store(true, Ordering::SeqCst);

    let summary = controller.run(&[container]).await.unwrap();

    assert!(summary.cancelled);
    assert!(summary.reports.is_empty());
    assert!(!dir.path().join("ep01.ass").exists());
}

#[test]
fn test_withConfig_withInvalidConfig_shouldFail() {
    let mut config = Config::default();
    config.honorifics.window_secs = 0;

    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_formatDuration_shouldPickLargestUnit() {
    assert_eq!(Controller::format_duration(Duration::from_millis(2_500)), "2.500s");
    assert_eq!(Controller::format_duration(Duration::from_secs(125)), "2m 5s");
    assert_eq!(Controller::format_duration(Duration::from_secs(3_725)), "1h 2m 5s");
}
