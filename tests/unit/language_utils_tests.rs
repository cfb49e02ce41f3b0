/*!
 * Tests for ISO language code utilities
 */

use weebanizer::language_utils::{get_language_name, normalize_to_part2b, normalize_to_part2t, primary_subtag};

#[test]
fn test_normalizeToPart2t_withMixedForms_shouldReturnTerminologyCode() {
    assert_eq!(normalize_to_part2t("ES").unwrap(), "spa");
    assert_eq!(normalize_to_part2t(" eng ").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("may").unwrap(), "msa");
}

#[test]
fn test_normalizeToPart2b_withIetfPrimarySubtag_shouldMatchBucketKeys() {
    assert_eq!(normalize_to_part2b(primary_subtag("es-419")).unwrap(), "spa");
    assert_eq!(normalize_to_part2b(primary_subtag("en-US")).unwrap(), "eng");
    assert_eq!(normalize_to_part2b(primary_subtag("ms_MY")).unwrap(), "may");
}

#[test]
fn test_getLanguageName_withUnknownCode_shouldFail() {
    assert!(get_language_name("und1").is_err());
    assert_eq!(get_language_name("es").unwrap(), "Spanish");
}
