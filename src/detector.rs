//! The holistic landmark detector boundary.
//!
//! Landmark detection itself happens in a vendor-supplied network; this
//! module only defines the request/response seam the rest of the pipeline is
//! written against, which also makes the buffering and windowing logic
//! testable without a real model.

use std::sync::Arc;

use crate::landmark::FrameLandmarks;

/// A single RGBA camera or video frame handed to the detector.
///
/// Frames are cheaply clonable; the pixel data is shared.
#[derive(Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
}

impl Frame {
    /// Creates a frame from raw RGBA pixel data.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not contain exactly `width * height` RGBA
    /// pixels.
    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        assert_eq!(
            data.len(),
            width as usize * height as usize * 4,
            "frame data does not match {width}x{height} RGBA"
        );
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Confidence and suppression thresholds for the holistic detector.
///
/// Each knob is independent, lies in `[MIN; MAX]`, and is adjusted by the UI
/// in steps of [`Thresholds::STEP`]. The detector reads the whole set when it
/// is (re)configured; changing a value has no effect on detections already in
/// flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min_face_detection_confidence: f32,
    pub min_face_presence_confidence: f32,
    pub min_face_suppression_threshold: f32,
    pub min_hand_landmarks_confidence: f32,
    pub min_pose_detection_confidence: f32,
    pub min_pose_presence_confidence: f32,
    pub min_pose_suppression_threshold: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_face_detection_confidence: 0.5,
            min_face_presence_confidence: 0.5,
            min_face_suppression_threshold: 0.5,
            min_hand_landmarks_confidence: 0.5,
            min_pose_detection_confidence: 0.3,
            min_pose_presence_confidence: 0.3,
            min_pose_suppression_threshold: 0.3,
        }
    }
}

impl Thresholds {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 1.0;
    pub const STEP: f32 = 0.1;

    /// Raises a threshold value by one step, clamped to [`Thresholds::MAX`].
    pub fn step_up(value: f32) -> f32 {
        (value + Self::STEP).min(Self::MAX)
    }

    /// Lowers a threshold value by one step, clamped to [`Thresholds::MIN`].
    pub fn step_down(value: f32) -> f32 {
        (value - Self::STEP).max(Self::MIN)
    }
}

/// Trait implemented by holistic landmark detectors.
///
/// Implementations wrap a vendor inference runtime. Constructing one is
/// expected to be fallible (missing model asset, unsupported configuration)
/// and terminal: callers report the error and do not retry.
pub trait Detector: Send + 'static {
    /// Runs landmark detection on a single frame.
    ///
    /// Body parts that were not detected stay NaN in the returned record. An
    /// `Err` means this frame produced no record at all; the caller logs it
    /// and drops the frame.
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<FrameLandmarks>;

    /// Applies a new threshold set.
    ///
    /// Vendor runtimes usually have to rebuild their internal graph for this,
    /// so it can fail; on failure the previous configuration stays active.
    fn set_thresholds(&mut self, thresholds: Thresholds) -> anyhow::Result<()>;
}
