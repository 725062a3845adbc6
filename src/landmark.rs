//! Holistic landmark records.
//!
//! A holistic detection result covers the whole upper body: face mesh, body
//! pose, and one set of hand landmarks per hand. The sequence classifier
//! consumes all of them as a single flat, fixed-shape record per frame, with
//! NaN marking every landmark that was not detected.

use std::ops::Range;

use crate::iter::zip_exact;

type Position = [f32; 3];

/// Total number of landmarks in a [`FrameLandmarks`] record.
pub const NUM_LANDMARKS: usize = 543;

/// The sub-ranges a [`FrameLandmarks`] record is partitioned into.
///
/// The order and sizes are fixed by the classifier's training data: 468 face
/// landmarks, then 21 left hand landmarks, 33 pose landmarks, and 21 right
/// hand landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Face,
    LeftHand,
    Pose,
    RightHand,
}

impl Block {
    pub const ALL: [Block; 4] = [Block::Face, Block::LeftHand, Block::Pose, Block::RightHand];

    /// Returns the range of landmark indices covered by this block.
    pub fn range(self) -> Range<usize> {
        match self {
            Block::Face => 0..468,
            Block::LeftHand => 468..489,
            Block::Pose => 489..522,
            Block::RightHand => 522..543,
        }
    }

    /// Returns the number of landmarks in this block.
    pub fn len(self) -> usize {
        self.range().len()
    }
}

/// The landmarks detected in a single camera or video frame.
///
/// Every record has the same shape ([`NUM_LANDMARKS`] positions of 3
/// coordinates each). Slots belonging to a body part that was not detected
/// in the frame keep their NaN sentinel; whether a landmark is present must
/// be determined with a NaN-check, never by comparing coordinate values.
#[derive(Clone)]
pub struct FrameLandmarks {
    positions: Box<[Position]>,
}

impl Default for FrameLandmarks {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLandmarks {
    /// Creates a record with every landmark marked as not detected.
    pub fn new() -> Self {
        Self {
            positions: vec![[f32::NAN; 3]; NUM_LANDMARKS].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Returns the positions of a single block.
    pub fn block(&self, block: Block) -> &[Position] {
        &self.positions[block.range()]
    }

    /// Copies a detector's per-block output into the record.
    ///
    /// Vendor face models commonly emit a few more points than the 468 the
    /// classifier was trained on; extra trailing entries are ignored. If the
    /// detector reported fewer positions than the block holds (in particular
    /// an empty list for "block not detected"), the remaining slots keep
    /// their NaN sentinel.
    pub fn set_block(&mut self, block: Block, positions: &[Position]) {
        let range = block.range();
        let n = positions.len().min(range.len());
        let out = &mut self.positions[range][..n];
        for (out, pos) in zip_exact(out, &positions[..n]) {
            *out = *pos;
        }
    }

    /// Returns whether at least one hand was detected in this frame.
    ///
    /// A hand block is either fully populated or fully NaN, so checking the
    /// first coordinate of the block's first landmark is sufficient.
    pub fn has_hand(&self) -> bool {
        [Block::LeftHand, Block::RightHand]
            .iter()
            .any(|&block| !self.positions[block.range().start][0].is_nan())
    }
}
