use crate::errors::PlanError;

// @module: Segment planning for overlapping cuts

/// A time range to cut, in whole seconds.
///
/// `end` may lie past the end of the media for the last range of an episode;
/// the cutting tool stops at the end of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start offset in seconds
    pub start: u64,
    /// Exclusive end offset in seconds
    pub end: u64,
}

impl TimeRange {
    /// Clip length to request from the cutting tool
    pub fn length(&self) -> u64 {
        self.end - self.start
    }
}

impl From<TimeRange> for (u64, u64) {
    fn from(range: TimeRange) -> Self {
        (range.start, range.end)
    }
}

/// Number of windows needed to cover `duration` seconds, i.e. `ceil(duration / window)`.
pub fn segment_count(duration: f64, window: u32) -> Result<usize, PlanError> {
    check_policy(duration, window)?;
    if duration <= 0.0 {
        return Ok(0);
    }

    // Integer stepping keeps the count independent of float rounding order
    let window = u64::from(window);
    let mut count = 0;
    let mut start: u64 = 0;
    while (start as f64) < duration {
        count += 1;
        start += window;
    }
    Ok(count)
}

/// Compute the ranges covering `duration` seconds with `window`-second steps,
/// each range extended by `overlap` seconds into the next one.
pub fn plan(duration: f64, window: u32, overlap: u32) -> Result<Vec<TimeRange>, PlanError> {
    let count = segment_count(duration, window)?;
    let window = u64::from(window);
    let clip = window + u64::from(overlap);

    Ok((0..count as u64)
        .map(|index| {
            let start = index * window;
            TimeRange { start, end: start + clip }
        })
        .collect())
}

/// Reject a window/overlap policy that cannot produce ranges
pub fn validate_policy(window: u32) -> Result<(), PlanError> {
    if window == 0 {
        return Err(PlanError::InvalidPolicy("window must be at least one second".to_string()));
    }
    Ok(())
}

fn check_policy(duration: f64, window: u32) -> Result<(), PlanError> {
    validate_policy(window)?;
    if !duration.is_finite() {
        return Err(PlanError::InvalidPolicy(format!("cannot plan a duration of {}", duration)));
    }
    Ok(())
}
