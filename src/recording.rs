//! Recording sessions and frozen recording buffers.

use std::ops::Range;

use crate::landmark::FrameLandmarks;
use crate::window;

/// An in-progress recording.
///
/// A session is created when the user starts recording and owns the buffer
/// of landmark records exclusively until [`RecordingSession::finish`] freezes
/// it. Records are only ever appended; the only way to "clear" a buffer is to
/// drop the session and start a new one.
pub struct RecordingSession {
    records: Vec<FrameLandmarks>,
}

impl RecordingSession {
    /// Starts a new recording with an empty buffer.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends one frame's landmark record, preserving arrival order.
    pub fn append(&mut self, record: FrameLandmarks) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ends the recording and freezes the buffer.
    pub fn finish(self) -> RecordingBuffer {
        log::debug!("recording finished with {} landmark records", self.records.len());
        RecordingBuffer {
            records: self.records,
        }
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished recording, ready for window selection and classification.
pub struct RecordingBuffer {
    records: Vec<FrameLandmarks>,
}

impl RecordingBuffer {
    /// Creates a buffer directly from a list of records.
    ///
    /// This is what the offline (video file) path uses; live recordings go
    /// through [`RecordingSession`].
    pub fn from_records(records: Vec<FrameLandmarks>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FrameLandmarks] {
        &self.records
    }

    /// Returns the classification window for this recording.
    ///
    /// `None` means the recording is empty and no classification should be
    /// performed.
    pub fn window(&self) -> Option<Range<usize>> {
        window::select(&self.records)
    }

    /// Returns the records inside the classification window.
    pub fn windowed_records(&self) -> Option<&[FrameLandmarks]> {
        self.window().map(|range| &self.records[range])
    }
}
