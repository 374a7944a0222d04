/*!
 * Segment filename codec and shared filename derivations.
 *
 * Segment files are named `<episode stem>_part_NN_of_MM.<ext>`, where `NN` is the
 * one-based ordinal and `MM` the segment count, both rendered on exactly two
 * digits. The title stage recovers the episode from that name alone, so every
 * stem/extension derivation used on either side of the pipeline lives here:
 * the enclosure URL to canonical filename mapping, the stem split used when
 * cutting, and the join used when resolving.
 *
 * Until its title is applied a segment carries an `.untitled` marker before
 * the extension, so titled and untitled segments never share a name.
 */

use std::path::Path;
use url::Url;

use crate::errors::NamingError;

const PART_MARKER: &str = "_part_";
const OF_MARKER: &str = "_of_";
const UNTITLED_MARKER: &str = ".untitled";

/// Length of `_part_NN_of_MM`
pub const SUFFIX_LEN: usize = PART_MARKER.len() + 2 + OF_MARKER.len() + 2;

/// Largest ordinal or total the two-digit suffix can carry
pub const MAX_SEGMENTS: u32 = 99;

/// Position metadata decoded from a segment filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentName {
    /// Stem of the episode the segment was cut from
    pub stem: String,
    /// One-based position of the segment
    pub ordinal: u32,
    /// Number of segments cut from the episode
    pub total: u32,
}

impl SegmentName {
    /// Create a segment name, validating the position
    pub fn new(stem: impl Into<String>, ordinal: u32, total: u32) -> Result<Self, NamingError> {
        let stem = stem.into();
        check_position(&stem, ordinal, total)?;
        Ok(Self { stem, ordinal, total })
    }
}

/// Encode the position suffix `_part_NN_of_MM` for a segment of `stem`.
pub fn encode(stem: &str, ordinal: u32, total: u32) -> Result<String, NamingError> {
    check_position(stem, ordinal, total)?;
    Ok(format!("{}{:02}{}{:02}", PART_MARKER, ordinal, OF_MARKER, total))
}

/// Build the full segment filename `<stem>_part_NN_of_MM.<extension>`.
pub fn segment_filename(stem: &str, ordinal: u32, total: u32, extension: &str) -> Result<String, NamingError> {
    let suffix = encode(stem, ordinal, total)?;
    Ok(join_stem(&format!("{}{}", stem, suffix), extension))
}

/// Decode a segment filename (or path) back to its episode stem and position.
///
/// Only the last `SUFFIX_LEN` characters of the stem are inspected, at fixed
/// offsets, so episode stems containing underscores or digits decode intact.
pub fn decode(segment_filename: &str) -> Result<SegmentName, NamingError> {
    let malformed = || NamingError::MalformedSegmentName(segment_filename.to_string());

    let (full_stem, _) = split_stem(basename(segment_filename));
    if full_stem.len() < SUFFIX_LEN || !full_stem.is_char_boundary(full_stem.len() - SUFFIX_LEN) {
        return Err(malformed());
    }

    let (stem, suffix) = full_stem.split_at(full_stem.len() - SUFFIX_LEN);
    let ordinal_start = PART_MARKER.len();
    let of_start = ordinal_start + 2;
    let total_start = of_start + OF_MARKER.len();

    if !suffix.is_ascii() {
        return Err(malformed());
    }
    if &suffix[..ordinal_start] != PART_MARKER || &suffix[of_start..total_start] != OF_MARKER {
        return Err(malformed());
    }

    let ordinal = parse_two_digits(&suffix[ordinal_start..of_start]).ok_or_else(malformed)?;
    let total = parse_two_digits(&suffix[total_start..]).ok_or_else(malformed)?;

    SegmentName::new(stem, ordinal, total).map_err(|_| malformed())
}

/// Whether `filename` decodes as a segment name
pub fn is_segment_filename(filename: &str) -> bool {
    decode(filename).is_ok()
}

/// Name a segment carries until its title is applied: `<stem>_part_NN_of_MM.untitled.<ext>`
pub fn untitled_filename(segment_filename: &str) -> String {
    let (stem, extension) = split_stem(segment_filename);
    join_stem(&format!("{}{}", stem, UNTITLED_MARKER), extension)
}

/// Final segment name of an untitled segment, or `None` when `filename` is not one
pub fn titled_filename(filename: &str) -> Option<String> {
    let (stem, extension) = split_stem(basename(filename));
    let segment = join_stem(stem.strip_suffix(UNTITLED_MARKER)?, extension);
    is_segment_filename(&segment).then_some(segment)
}

/// Split a filename into stem and extension at the last dot.
///
/// A leading dot (hidden file) is part of the stem, and a name without a dot
/// has an empty extension.
pub fn split_stem(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(index) if index > 0 => (&filename[..index], &filename[index + 1..]),
        _ => (filename, ""),
    }
}

/// Inverse of `split_stem`
pub fn join_stem(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// Final component of a path-like string, accepting both separators
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Filename component of a path, lossily converted
pub fn path_filename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Canonical filename of an episode: the final path segment of its enclosure URL.
///
/// Query strings and fragments are ignored when the URL parses; otherwise the
/// text after the last `/` is used as is.
pub fn canonical_filename(enclosure_url: &str) -> String {
    let trimmed = enclosure_url.trim();
    if let Ok(url) = Url::parse(trimmed) {
        if let Some(segment) = url.path_segments().and_then(|mut segments| segments.next_back()) {
            if !segment.is_empty() {
                return segment.to_string();
            }
        }
    }

    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    without_query.rsplit('/').next().unwrap_or(without_query).to_string()
}

fn check_position(stem: &str, ordinal: u32, total: u32) -> Result<(), NamingError> {
    if ordinal > MAX_SEGMENTS || total > MAX_SEGMENTS {
        return Err(NamingError::EncodingOverflow {
            stem: stem.to_string(),
            ordinal,
            total,
        });
    }
    if ordinal == 0 || ordinal > total {
        return Err(NamingError::InvalidPosition {
            stem: stem.to_string(),
            ordinal,
            total,
        });
    }
    Ok(())
}

fn parse_two_digits(text: &str) -> Option<u32> {
    if text.len() == 2 && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}
