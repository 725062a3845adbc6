//! Recording window selection.
//!
//! Hand landmark detection is noisy at the start and end of a recording,
//! while the user's hands enter and leave the frame. The classifier performs
//! noticeably better on a tightly cropped window, so before classification
//! the recording is trimmed to the span of frames in which a hand was
//! actually detected, padded back out to a minimum length when that span is
//! very short.

use std::ops::Range;

use itertools::{Itertools, MinMaxResult};

use crate::landmark::FrameLandmarks;

/// The smallest window that is worth handing to the classifier.
pub const MIN_WINDOW: usize = 10;

/// Selects the sub-sequence of `records` most likely to contain the signed
/// gesture.
///
/// Returns `None` for an empty recording (nothing to classify). If no frame
/// contains a hand detection the entire recording is returned unmodified.
/// Otherwise the window is the span from the first to the last frame with a
/// hand detection, symmetrically expanded to [`MIN_WINDOW`] frames if the
/// span is shorter: each round grows the start by one frame, then the end,
/// with both sides clamped to the recording bounds independently.
pub fn select(records: &[FrameLandmarks]) -> Option<Range<usize>> {
    if records.is_empty() {
        return None;
    }

    let (first, last) = match records.iter().positions(|rec| rec.has_hand()).minmax() {
        MinMaxResult::NoElements => return Some(0..records.len()),
        MinMaxResult::OneElement(index) => (index, index),
        MinMaxResult::MinMax(first, last) => (first, last),
    };

    let mut start = first;
    let mut end = last;
    while end - start + 1 < MIN_WINDOW {
        let width = end - start;
        if start > 0 {
            start -= 1;
        }
        if end - start + 1 < MIN_WINDOW && end + 1 < records.len() {
            end += 1;
        }
        if end - start == width {
            // Clamped at both bounds, the recording is shorter than the
            // minimum window.
            break;
        }
    }

    Some(start..end + 1)
}
