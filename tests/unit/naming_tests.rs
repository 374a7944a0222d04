/*!
 * Tests for the segment filename codec
 */

use podsplit::errors::NamingError;
use podsplit::naming::{self, SegmentName, MAX_SEGMENTS};

/// Test that every valid position decodes back, whatever the stem looks like
#[test]
fn test_decode_ofEncodedNames_shouldRecoverStemAndPosition() {
    let stems = [
        "ep1",
        "show_12_of_2024",
        "a_part_01_of_02",
        "émission spéciale",
        "x",
        "2024-01-01_interview",
    ];

    for stem in stems {
        for total in [1u32, 2, 9, 10, 42, MAX_SEGMENTS] {
            for ordinal in [1, total / 2 + 1, total] {
                let filename = naming::segment_filename(stem, ordinal, total, "mp3").unwrap();
                let decoded = naming::decode(&filename).unwrap();
                assert_eq!(decoded, SegmentName::new(stem, ordinal, total).unwrap(), "{}", filename);
            }
        }
    }
}

#[test]
fn test_encode_shouldPadOnTwoDigits() {
    assert_eq!(naming::encode("ep1", 3, 12).unwrap(), "_part_03_of_12");
    assert_eq!(naming::segment_filename("ep1", 1, 1, "mp3").unwrap(), "ep1_part_01_of_01.mp3");
}

#[test]
fn test_encode_withHundredSegments_shouldOverflow() {
    assert!(matches!(
        naming::encode("long", 100, 100),
        Err(NamingError::EncodingOverflow { ordinal: 100, total: 100, .. })
    ));
    assert!(matches!(naming::encode("long", 1, 100), Err(NamingError::EncodingOverflow { .. })));
}

#[test]
fn test_encode_withOrdinalOutOfRange_shouldBeInvalidPosition() {
    assert!(matches!(naming::encode("ep", 0, 3), Err(NamingError::InvalidPosition { .. })));
    assert!(matches!(naming::encode("ep", 4, 3), Err(NamingError::InvalidPosition { .. })));
}

#[test]
fn test_decode_withPlainNames_shouldBeMalformed() {
    for name in ["ep1.mp3", "rss.xml", "x_part_1_of_2.mp3", "x_part_ab_of_02.mp3", "_part_02_of_01.mp3", "x_piece_01_of_02.mp3"] {
        assert!(
            matches!(naming::decode(name), Err(NamingError::MalformedSegmentName(_))),
            "{} should not decode",
            name
        );
        assert!(!naming::is_segment_filename(name));
    }
}

#[test]
fn test_decode_withPath_shouldUseFinalComponent() {
    let decoded = naming::decode("/srv/parts/ep1_part_02_of_03.mp3").unwrap();
    assert_eq!(decoded.stem, "ep1");
    assert_eq!((decoded.ordinal, decoded.total), (2, 3));
}

#[test]
fn test_canonical_filename_shouldTakeLastUrlSegment() {
    assert_eq!(naming::canonical_filename("https://example.org/a/b/ep1.mp3"), "ep1.mp3");
    assert_eq!(naming::canonical_filename("https://example.org/ep1.mp3?x=1#t=30"), "ep1.mp3");
    assert_eq!(naming::canonical_filename("podcasts/ep2.mp3"), "ep2.mp3");
}
