/*!
 * Tests for the localization stages on in-memory documents
 */

use std::sync::Arc;

use weebanizer::app_config::{Config, HonorificConfig, LanguageBucket, PriorityTable};
use weebanizer::demux::Track;
use weebanizer::localization::{
    CreditScrubber, HonorificSource, HonorificTransfer, LocalizationPipeline, NormalizeOutcome, TrackScorer,
};
use weebanizer::providers::mock::MockProvider;
use weebanizer::providers::Provider;
use weebanizer::subtitle_processor::{SubtitleCollection, SubtitleEntry};

use crate::common::{self, FixtureDemuxer};

fn document(lines: &[(u64, &str)]) -> SubtitleCollection {
    let entries = lines
        .iter()
        .enumerate()
        .map(|(i, (start, text))| SubtitleEntry::new(i + 1, *start, start + 1000, text.to_string()))
        .collect();
    SubtitleCollection::from_entries(entries, "spa")
}

#[test]
fn test_selectBest_withLatamAndCastilian_shouldPreferLatam() {
    let table = PriorityTable::default();
    let tracks = vec![
        Track::subtitle(1, "spa", "es-ES", "Español (España)"),
        Track::subtitle(2, "spa", "es-419", "CR_Spanish(Latin_America)"),
        Track::subtitle(3, "eng", "en", "English"),
        Track::subtitle(4, "jpn", "ja", "Japanese"),
    ];

    let selection = TrackScorer::new(&table).select_best(&tracks);

    assert_eq!(selection.get(LanguageBucket::Spanish).unwrap().track.id, 2);
    assert_eq!(selection.get(LanguageBucket::Spanish).unwrap().score, 3);
    assert_eq!(selection.get(LanguageBucket::English).unwrap().track.id, 3);
    assert!(selection.get(LanguageBucket::Malay).is_none());
}

#[test]
fn test_transfer_withSourceOneSecondLater_shouldAttachSuffix() {
    let engine = HonorificTransfer::new(&HonorificConfig::default()).unwrap();
    let source = document(&[(11_000, "Thanks, Alice-san.")]);
    let mut target = document(&[(4_000, "¿Alice?"), (10_000, "Gracias, Alice.")]);

    let stats = engine.transfer(&source, &mut target);

    assert_eq!(stats.lines_rewritten, 1);
    assert_eq!(target.entries[0].text, "¿Alice?");
    assert_eq!(target.entries[1].text, "Gracias, Alice-san.");
}

#[test]
fn test_transfer_withPolitenessPhrase_shouldReplaceItWithSuffix() {
    let engine = HonorificTransfer::new(&HonorificConfig::default()).unwrap();
    let source = document(&[(2_000, "Alice-san, please come in.")]);
    let mut target = document(&[(2_000, "La señorita Alice, pase por favor.")]);

    engine.transfer(&source, &mut target);

    assert_eq!(target.entries[0].text, "Alice-san, pase por favor.");
}

#[test]
fn test_transfer_appliedTwice_shouldNotStackSuffixes() {
    let engine = HonorificTransfer::new(&HonorificConfig::default()).unwrap();
    let source = document(&[(2_000, "Bob-kun!")]);
    let mut target = document(&[(2_000, "¡Bob!")]);

    engine.transfer(&source, &mut target);
    engine.transfer(&source, &mut target);

    assert_eq!(target.entries[0].text, "¡Bob-kun!");
}

#[test]
fn test_collapseRepeated_shouldKeepSingleSuffix() {
    let engine = HonorificTransfer::new(&HonorificConfig::default()).unwrap();

    assert_eq!(engine.collapse_repeated("Alice-san-san-san"), "Alice-san");
    assert_eq!(engine.collapse_repeated("Bob-kun-san"), "Bob-kun-san");
}

#[test]
fn test_chooseSource_withHonorificsInBoth_shouldPreferEnglish() {
    let engine = HonorificTransfer::new(&HonorificConfig::default()).unwrap();
    let english = document(&[(0, "Alice-san")]);
    let malay = document(&[(0, "Alice-chan")]);

    let (source, _) = engine.choose_source(Some(&english), Some(&malay)).unwrap();

    assert_eq!(source, HonorificSource::English);
    assert!(engine.choose_source(None, None).is_none());
}

#[test]
fn test_creditScrubber_withCustomLabels_shouldOnlyBlankThoseLabels() {
    let scrubber = CreditScrubber::new(&["Tipografía".to_string()]).unwrap();
    let mut doc = document(&[(0, "Tipografía: Y"), (1_000, "Traducción: X")]);

    assert_eq!(scrubber.scrub(&mut doc), 1);
    assert_eq!(doc.entries[0].text, "");
    assert_eq!(doc.entries[1].text, "Traducción: X");
}

#[tokio::test]
async fn test_processDocuments_withMalayOnly_shouldUseMalaySuffix() {
    common::init_logger();
    let pipeline =
        LocalizationPipeline::new(Arc::new(Config::default()), Arc::new(FixtureDemuxer::new()), None).unwrap();
    let english = document(&[(2_000, "Alice, wait!")]);
    let malay = document(&[(2_100, "Alice-chan, tunggu!")]);
    let mut target = document(&[(1_000, "Traducción: X"), (2_000, "Hola Alice")]);

    let stats = pipeline.process_documents(&mut target, Some(&english), Some(&malay)).await;

    assert_eq!(stats.credits_blanked, 1);
    assert_eq!(stats.honorific_source, Some(HonorificSource::Malay));
    assert_eq!(stats.names, NormalizeOutcome::Disabled);
    assert_eq!(target.entries[1].text, "Hola Alice-chan");
}

#[tokio::test]
async fn test_processDocuments_withOracleOmittingPair_shouldKeepOriginalOrder() {
    let oracle = MockProvider::working("Uzumaki Naruto\n");
    let shared: Arc<dyn Provider> = Arc::new(oracle.clone());
    let pipeline =
        LocalizationPipeline::new(Arc::new(Config::default()), Arc::new(FixtureDemuxer::new()), Some(shared)).unwrap();
    let mut target = document(&[(0, "Naruto Uzumaki y Autos Locos"), (1_000, "Naruto Uzumakis")]);

    let stats = pipeline.process_documents(&mut target, None, None).await;

    assert_eq!(stats.names, NormalizeOutcome::Applied { mappings: 1, lines_changed: 1 });
    assert_eq!(target.entries[0].text, "Uzumaki Naruto y Autos Locos");
    assert_eq!(target.entries[1].text, "Naruto Uzumakis");
    assert_eq!(oracle.request_count(), 1);
    assert!(oracle.requests()[0].input.contains("Autos Locos"));
}
