/*!
 * Tests for script loading and segmentation
 */

use podwright::script::{
    segment_document, MarkupSegmenter, NarrationDocument, PlainTextSegmenter, SegmentKind,
};

use crate::common;

#[test]
fn test_fromContent_shouldDetectMarkup() {
    let document = NarrationDocument::from_content(common::sample_markup_script());
    assert_eq!(document.kind(), SegmentKind::Markup);
}

#[test]
fn test_fromContent_shouldDefaultToPlainText() {
    let document = NarrationDocument::from_content("Just words.");
    assert_eq!(document.kind(), SegmentKind::PlainText);
}

#[test]
fn test_fromFile_shouldLoadScript() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "script.txt", "Hello listeners.").unwrap();
    let document = NarrationDocument::from_file(&path).unwrap();
    assert_eq!(document.content(), "Hello listeners.");
}

#[test]
fn test_segmentDocument_shouldIndexSegmentsInOrder() {
    let document = NarrationDocument::from_content(common::sample_plain_script(10));
    let segments = segment_document(&document, 200).unwrap();
    assert!(segments.len() > 1);
    for (i, segment) in segments.iter().enumerate() {
        assert_eq!(segment.index, i);
        assert_eq!(segment.kind, SegmentKind::PlainText);
        assert!(segment.content.chars().count() <= 200);
    }
}

#[test]
fn test_plainTextSegmenter_shouldPreserveAllText() {
    let script = common::sample_plain_script(8);
    let chunks = PlainTextSegmenter::new(250).segment(&script).unwrap();

    // Same words in the same order once whitespace is normalized
    let original: Vec<&str> = script.split_whitespace().collect();
    let reassembled: Vec<String> = chunks
        .iter()
        .flat_map(|c| c.split_whitespace().map(str::to_owned))
        .collect();
    assert_eq!(original, reassembled);
}

#[test]
fn test_plainTextSegmenter_shouldBeDeterministic() {
    let script = common::sample_plain_script(6);
    let segmenter = PlainTextSegmenter::new(300);
    assert_eq!(
        segmenter.segment(&script).unwrap(),
        segmenter.segment(&script).unwrap()
    );
}

#[test]
fn test_markupSegmenter_shouldKeepChunksWrapped() {
    let script = common::sample_markup_script();
    let chunks = MarkupSegmenter::new(60).segment(&script).unwrap();
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.starts_with("<speak>"));
        assert!(chunk.ends_with("</speak>"));
    }
}

#[test]
fn test_markupSegmenter_unbalancedInput_shouldFail() {
    let result = MarkupSegmenter::new(100).segment("<speak><voice>oops</speak>");
    assert!(result.is_err());
}

#[test]
fn test_segmentDocument_markup_shouldTagSegmentsAsMarkup() {
    let document = NarrationDocument::from_content(common::sample_markup_script());
    let segments = segment_document(&document, 60).unwrap();
    assert!(segments.iter().all(|s| s.kind == SegmentKind::Markup));
}
