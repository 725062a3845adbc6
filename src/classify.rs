//! Sign sequence classification.
//!
//! The classifier network consumes a whole recording window at once – one
//! fixed-shape landmark record per frame – and produces one score per known
//! sign label. This module shapes the window into the tensor layout the
//! network expects and reduces the score vector to the few best labels.

use std::cmp::Reverse;
use std::fs;
use std::path::Path;

use tract_onnx::prelude::{tract_ndarray, Tensor};

use crate::iter::zip_exact;
use crate::landmark::{FrameLandmarks, NUM_LANDMARKS};
use crate::nn::NeuralNetwork;
use crate::num::TotalF32;
use crate::timer::Timer;

/// Number of sign labels the classifier distinguishes.
pub const NUM_SIGNS: usize = 250;

/// Number of results reported per classification.
pub const TOP_K: usize = 3;

/// Trait implemented by sequence classification networks.
pub trait Network: Send + 'static {
    /// Runs the network on a `[frames, 543, 3]` sequence tensor, returning
    /// one score per known sign label.
    ///
    /// Landmark slots that were not detected carry NaN; the network is
    /// expected to handle the sentinel itself. Failures are not retried.
    fn infer(&mut self, sequence: Tensor) -> anyhow::Result<Vec<f32>>;
}

/// A [`Network`] backed by an ONNX sequence model.
pub struct SequenceModel {
    nn: NeuralNetwork,
}

impl SequenceModel {
    /// Loads the model from an `.onnx` file.
    ///
    /// This is done once at startup; a failure here is terminal for the
    /// classification feature. The model is released when the last handle to
    /// it is dropped.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            nn: NeuralNetwork::from_path(path)?.load()?,
        })
    }

    pub fn new(nn: NeuralNetwork) -> Self {
        Self { nn }
    }
}

impl Network for SequenceModel {
    fn infer(&mut self, sequence: Tensor) -> anyhow::Result<Vec<f32>> {
        let outputs = self.nn.estimate(sequence)?;
        anyhow::ensure!(!outputs.is_empty(), "sequence model produced no outputs");

        let scores = outputs[0].as_slice::<f32>()?;
        Ok(scores.to_vec())
    }
}

/// The sign label list, loaded alongside the model.
///
/// Label order matches the network's output order: the score at index `i`
/// belongs to label `i`.
pub struct Labels {
    labels: Vec<String>,
}

impl Labels {
    /// Loads labels from a text file with one label per line.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::new(text.lines().map(|line| line.trim().to_string()))
    }

    pub fn new<I: IntoIterator<Item = String>>(labels: I) -> anyhow::Result<Self> {
        let labels = labels
            .into_iter()
            .filter(|label| !label.is_empty())
            .collect::<Vec<_>>();
        anyhow::ensure!(!labels.is_empty(), "label list is empty");
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> &str {
        &self.labels[index]
    }
}

/// A single classified sign.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    label: String,
    score: f32,
}

impl Classification {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn score(&self) -> f32 {
        self.score
    }
}

/// Turns recording windows into top-[`TOP_K`] sign classifications.
pub struct SignClassifier {
    network: Box<dyn Network>,
    labels: Labels,
    t_pack: Timer,
    t_infer: Timer,
}

impl SignClassifier {
    pub fn new<N: Network>(network: N, labels: Labels) -> Self {
        Self {
            network: Box::new(network),
            labels,
            t_pack: Timer::new("pack"),
            t_infer: Timer::new("infer"),
        }
    }

    /// Returns profiling timers for this classifier.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_pack, &self.t_infer].into_iter()
    }

    /// Classifies a recording window, returning the [`TOP_K`] best labels in
    /// descending score order.
    ///
    /// Ties are broken in favor of the lower label index. If the network
    /// knows fewer labels than [`TOP_K`], all of them are returned.
    ///
    /// # Panics
    ///
    /// Panics when `records` is empty. Window selection never produces an
    /// empty window, so an empty slice here is a bug in the caller.
    pub fn classify(&mut self, records: &[FrameLandmarks]) -> anyhow::Result<Vec<Classification>> {
        assert!(!records.is_empty(), "classification window must not be empty");

        let sequence = self.t_pack.time(|| pack_sequence(records));
        let scores = self.t_infer.time(|| self.network.infer(sequence))?;
        anyhow::ensure!(
            scores.len() == self.labels.len(),
            "model produced {} scores for {} labels",
            scores.len(),
            self.labels.len(),
        );

        let results = top_k(&scores, TOP_K)
            .into_iter()
            .map(|(index, score)| Classification {
                label: self.labels.get(index).to_string(),
                score,
            })
            .collect::<Vec<_>>();
        log::debug!(
            "classified {} frames: {:?}",
            records.len(),
            results
                .iter()
                .map(|c| format!("{} ({:.2})", c.label, c.score))
                .collect::<Vec<_>>(),
        );
        Ok(results)
    }
}

/// Packs a window of landmark records into a `[frames, 543, 3]` tensor.
///
/// NaN sentinels are passed through unchanged.
fn pack_sequence(records: &[FrameLandmarks]) -> Tensor {
    let mut input = tract_ndarray::Array3::<f32>::zeros((records.len(), NUM_LANDMARKS, 3));
    for (mut frame, record) in zip_exact(input.outer_iter_mut(), records) {
        for (mut landmark, position) in zip_exact(frame.outer_iter_mut(), record.positions()) {
            for (out, coord) in zip_exact(landmark.iter_mut(), position) {
                *out = *coord;
            }
        }
    }

    input.into()
}

/// Returns the indices and values of the `k` highest scores, descending.
fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut order = (0..scores.len()).collect::<Vec<_>>();
    // Stable sort, so equal scores stay in index order.
    order.sort_by_key(|&index| Reverse(TotalF32(scores[index])));
    order
        .into_iter()
        .take(k)
        .map(|index| (index, scores[index]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Block;

    struct FakeNetwork {
        scores: Vec<f32>,
    }

    impl Network for FakeNetwork {
        fn infer(&mut self, sequence: Tensor) -> anyhow::Result<Vec<f32>> {
            assert_eq!(sequence.shape()[1..], [NUM_LANDMARKS, 3]);
            Ok(self.scores.clone())
        }
    }

    fn labels(n: usize) -> Labels {
        Labels::new((0..n).map(|i| format!("sign-{i}"))).unwrap()
    }

    #[test]
    fn top_k_picks_distinct_maxima_in_order() {
        let mut scores = vec![0.001; NUM_SIGNS];
        scores[17] = 0.9;
        scores[3] = 0.7;
        scores[240] = 0.8;

        let top = top_k(&scores, 3);
        assert_eq!(top, vec![(17, 0.9), (240, 0.8), (3, 0.7)]);
    }

    #[test]
    fn top_k_breaks_ties_by_first_index() {
        let scores = [0.2, 0.8, 0.8, 0.1];
        assert_eq!(top_k(&scores, 3), vec![(1, 0.8), (2, 0.8), (0, 0.2)]);
    }

    #[test]
    fn classifier_returns_best_labels() {
        let mut scores = vec![0.0; NUM_SIGNS];
        scores[5] = 0.6;
        scores[100] = 0.3;
        scores[249] = 0.1;

        let mut classifier = SignClassifier::new(FakeNetwork { scores }, labels(NUM_SIGNS));
        let results = classifier.classify(&[FrameLandmarks::new()]).unwrap();

        let labels = results.iter().map(|c| c.label()).collect::<Vec<_>>();
        assert_eq!(labels, ["sign-5", "sign-100", "sign-249"]);
        assert!(results.windows(2).all(|w| w[0].score() >= w[1].score()));
    }

    #[test]
    fn score_label_mismatch_is_an_error() {
        let mut classifier = SignClassifier::new(
            FakeNetwork {
                scores: vec![0.5; NUM_SIGNS],
            },
            labels(10),
        );
        assert!(classifier.classify(&[FrameLandmarks::new()]).is_err());
    }

    #[test]
    #[should_panic = "classification window must not be empty"]
    fn empty_window_is_a_contract_violation() {
        let mut classifier = SignClassifier::new(
            FakeNetwork {
                scores: vec![0.5; NUM_SIGNS],
            },
            labels(NUM_SIGNS),
        );
        classifier.classify(&[]).unwrap();
    }

    #[test]
    fn pack_preserves_positions_and_sentinels() {
        let mut record = FrameLandmarks::new();
        record.set_block(Block::LeftHand, &[[0.25, 0.75, -0.5]; 21]);

        let tensor = pack_sequence(&[record]);
        assert_eq!(tensor.shape(), [1, NUM_LANDMARKS, 3]);

        let values = tensor.as_slice::<f32>().unwrap();
        let left_hand = Block::LeftHand.range().start * 3;
        assert_eq!(values[left_hand..left_hand + 3], [0.25, 0.75, -0.5]);
        // Undetected slots stay NaN.
        assert!(values[0].is_nan());
    }

    #[test]
    fn empty_label_lines_are_skipped() {
        let labels = Labels::new(
            ["hello", "", "world"]
                .into_iter()
                .map(String::from),
        )
        .unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get(1), "world");

        assert!(Labels::new(std::iter::empty()).is_err());
    }
}
