/*!
 * Tests for subtitle file reading and writing
 */

use weebanizer::errors::SubtitleError;
use weebanizer::subtitle_processor::{SubtitleCollection, SubtitleEntry, SubtitleFormat};

use crate::common;

#[test]
fn test_load_withAssFile_shouldKeepStylesAndTextCommas() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "ep.ass", common::SPANISH_ASS).unwrap();

    let doc = SubtitleCollection::load(&path, "spa").unwrap();

    assert_eq!(doc.format, SubtitleFormat::Ass);
    assert_eq!(doc.source_file, path);
    assert_eq!(doc.entries.len(), 2);
    assert_eq!(doc.entries[1].text, "Hola Alice, ¿cómo estás?");
    assert_eq!(doc.entries[1].start_time_ms, 2000);
}

#[test]
fn test_toAssString_afterEdit_shouldPreserveHeaderAndFields() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "ep.ass", common::SPANISH_ASS).unwrap();
    let mut doc = SubtitleCollection::load(&path, "spa").unwrap();
    doc.entries[0].text.clear();

    let written = doc.to_ass_string();

    assert!(written.contains("Title: Episodio 1"));
    assert!(written.contains("Style: Default,Arial,20"));
    assert!(written.contains("Dialogue: 0,0:00:01.00,0:00:01.90,Default,,0,0,0,,\n"));
    assert!(written.contains("Dialogue: 0,0:00:02.00,0:00:03.00,Default,,0,0,0,,Hola Alice, ¿cómo estás?"));
}

#[test]
fn test_load_withBomSrt_shouldDetectSrt() {
    let dir = common::create_temp_dir().unwrap();
    let content = format!("\u{feff}{}", common::SPANISH_SRT);
    let path = common::create_test_file(dir.path(), "ep.srt", &content).unwrap();

    let doc = SubtitleCollection::load(&path, "spa").unwrap();

    assert_eq!(doc.format, SubtitleFormat::Srt);
    assert_eq!(doc.entries[0].text, "Traducción: X");
    assert_eq!(doc.entries[1].seq_num, 2);
}

#[test]
fn test_load_withMissingFile_shouldReturnIoError() {
    let dir = common::create_temp_dir().unwrap();

    let result = SubtitleCollection::load(dir.path().join("missing.ass"), "spa");

    assert!(matches!(result, Err(SubtitleError::Io { .. })));
}

#[test]
fn test_parseStr_withEventsButNoFormat_shouldFail() {
    let content = "[Script Info]\nTitle: x\n\n[Events]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hola\n";

    let result = SubtitleCollection::parse_str(content, "spa");

    assert!(matches!(result, Err(SubtitleError::MissingFormat)));
}

#[test]
fn test_timestamps_shouldConvertBetweenFormats() {
    assert_eq!(SubtitleEntry::parse_timestamp("01:02:03,456").unwrap(), 3_723_456);
    assert_eq!(SubtitleEntry::parse_ass_timestamp("1:02:03.45").unwrap(), 3_723_450);
    assert_eq!(SubtitleEntry::format_ass_timestamp(3_723_450), "1:02:03.45");
    assert!(SubtitleEntry::parse_timestamp("not a time").is_err());
}
