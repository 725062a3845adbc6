//! Capture sessions: feeding camera frames through the detector into a
//! recording.
//!
//! The camera delivers frames from its own thread, the detector is too slow
//! to see every one of them, and start/stop comes from the UI. [`Recorder`]
//! untangles this with a single worker thread that owns both the detector
//! and the active [`RecordingSession`]: frames arrive through a
//! keep-only-latest slot, control messages through their own channel, so
//! "clear on start" and "append from detection" can never interleave.
//!
//! A recording may contain fewer records than the camera produced frames –
//! frames the detector did not get around to are dropped, not interpolated.
//! Stopping does not cancel an in-flight detection; its result is discarded
//! because the session is already closed.

use std::io;
use std::panic::resume_unwind;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{never, select, Receiver, Sender};
use pawawwewism::{promise, Promise, PromiseHandle};

use crate::detector::{Detector, Frame, Thresholds};
use crate::pipeline::{latest_channel, LatestSender};
use crate::recording::{RecordingBuffer, RecordingSession};
use crate::timer::{FpsCounter, Timer};

enum Ctrl {
    Start,
    Stop(Promise<RecordingBuffer>),
    Thresholds(Thresholds),
}

/// Drives a [`Detector`] on its own worker thread.
///
/// When dropped, the channels to the thread are dropped and the thread is
/// joined. If the thread has panicked, the panic will be forwarded to the
/// thread dropping the `Recorder`.
pub struct Recorder {
    ctrl: Option<Sender<Ctrl>>,
    frames: Option<LatestSender<Frame>>,
    handle: Option<JoinHandle<()>>,
}

impl Recorder {
    /// Spawns the detector worker thread.
    pub fn spawn<D: Detector>(detector: D) -> io::Result<Self> {
        let (ctrl, ctrl_rx) = crossbeam_channel::unbounded();
        let (frames, frame_rx) = latest_channel();
        let handle = thread::Builder::new()
            .name("landmark detector".into())
            .spawn(move || run_detector(detector, ctrl_rx, frame_rx))?;

        Ok(Self {
            ctrl: Some(ctrl),
            frames: Some(frames),
            handle: Some(handle),
        })
    }

    /// Offers a camera frame to the detector. Never blocks.
    ///
    /// If the detector is still busy with an earlier frame, that frame's
    /// undelivered predecessor is discarded (keep-only-latest). Frames
    /// offered while no recording is active are dropped without running the
    /// detector.
    pub fn push_frame(&mut self, frame: Frame) {
        if !self.frames.as_ref().unwrap().send(frame) {
            self.wait_for_exit();
        }
    }

    /// Starts a new recording, discarding a previous unfinished one.
    pub fn start(&mut self) {
        self.send_ctrl(Ctrl::Start);
    }

    /// Stops the active recording.
    ///
    /// The returned handle resolves to the frozen recording once the worker
    /// has processed the stop; records from detections that surface later are
    /// dropped. Stopping without a preceding [`Recorder::start`] yields an
    /// empty recording.
    pub fn stop(&mut self) -> PromiseHandle<RecordingBuffer> {
        let (promise, handle) = promise();
        self.send_ctrl(Ctrl::Stop(promise));
        handle
    }

    /// Applies a new detector threshold set.
    ///
    /// Takes effect for subsequent frames; a failure to reconfigure is logged
    /// and the previous thresholds stay active.
    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.send_ctrl(Ctrl::Thresholds(thresholds));
    }

    fn send_ctrl(&mut self, msg: Ctrl) {
        if self.ctrl.as_ref().unwrap().send(msg).is_err() {
            self.wait_for_exit();
        }
    }

    fn wait_for_exit(&mut self) {
        // Wait for the worker to exit and propagate its panic if it panicked.
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => {}
                Err(payload) => {
                    if !thread::panicking() {
                        resume_unwind(payload);
                    }
                }
            }
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        drop(self.ctrl.take());
        drop(self.frames.take());
        self.wait_for_exit();
    }
}

fn run_detector<D: Detector>(mut detector: D, ctrl: Receiver<Ctrl>, frames: Receiver<Frame>) {
    log::trace!("detector worker starting");

    let mut frames = frames;
    let mut session: Option<RecordingSession> = None;
    let mut fps = FpsCounter::new("detector");
    let mut t_detect = Timer::new("detect");

    loop {
        select! {
            recv(ctrl) -> msg => match msg {
                Ok(Ctrl::Start) => session = Some(RecordingSession::new()),
                Ok(Ctrl::Stop(promise)) => {
                    let session = session.take().unwrap_or_default();
                    promise.fulfill(session.finish());
                }
                Ok(Ctrl::Thresholds(thresholds)) => {
                    if let Err(e) = detector.set_thresholds(thresholds) {
                        log::error!("failed to apply detector thresholds: {e}");
                    }
                }
                Err(_) => break,
            },
            recv(frames) -> frame => match frame {
                Ok(frame) => {
                    let Some(session) = session.as_mut() else { continue };
                    match t_detect.time(|| detector.detect(&frame)) {
                        Ok(record) => session.append(record),
                        Err(e) => log::warn!("dropping frame, detection failed: {e}"),
                    }
                    fps.tick_with([&t_detect]);
                }
                // The frame sender is gone, but a stop may still be queued.
                Err(_) => frames = never(),
            },
        }
    }

    log::trace!("detector worker exiting");
}

/// Runs the detector synchronously over the frames of a pre-recorded video.
///
/// Unlike the live path there is no backpressure: every frame is processed,
/// in order, blocking until done. Frames that fail detection are logged and
/// dropped, like in the live path.
pub fn detect_video<D: Detector>(
    detector: &mut D,
    frames: impl IntoIterator<Item = Frame>,
) -> RecordingBuffer {
    let mut session = RecordingSession::new();
    for frame in frames {
        match detector.detect(&frame) {
            Ok(record) => session.append(record),
            Err(e) => log::warn!("dropping frame, detection failed: {e}"),
        }
    }
    session.finish()
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::time::Duration;

    use crossbeam_channel::unbounded;

    use super::*;
    use crate::landmark::{Block, FrameLandmarks};

    const TIMEOUT: Duration = Duration::from_secs(5);
    const SILENCE: Duration = Duration::from_millis(100);

    struct FakeDetector {
        detections: Sender<()>,
        thresholds: Sender<Thresholds>,
        fail: bool,
    }

    impl FakeDetector {
        fn new() -> (Self, Receiver<()>, Receiver<Thresholds>) {
            let (detections, detections_rx) = unbounded();
            let (thresholds, thresholds_rx) = unbounded();
            (
                Self {
                    detections,
                    thresholds,
                    fail: false,
                },
                detections_rx,
                thresholds_rx,
            )
        }
    }

    impl Detector for FakeDetector {
        fn detect(&mut self, _frame: &Frame) -> anyhow::Result<FrameLandmarks> {
            self.detections.send(()).ok();
            if self.fail {
                anyhow::bail!("synthetic detection failure");
            }
            let mut record = FrameLandmarks::new();
            record.set_block(Block::LeftHand, &[[0.5, 0.5, 0.0]; 21]);
            Ok(record)
        }

        fn set_thresholds(&mut self, thresholds: Thresholds) -> anyhow::Result<()> {
            self.thresholds.send(thresholds).ok();
            Ok(())
        }
    }

    fn frame() -> Frame {
        Frame::new(2, 2, vec![0; 16])
    }

    #[test]
    fn recording_collects_detected_frames() {
        let (detector, detections, _) = FakeDetector::new();
        let mut recorder = Recorder::spawn(detector).unwrap();

        recorder.start();
        recorder.push_frame(frame());
        detections.recv_timeout(TIMEOUT).unwrap();

        let buffer = recorder.stop().block().unwrap();
        assert_eq!(buffer.len(), 1);
        assert!(buffer.records()[0].has_hand());
    }

    #[test]
    fn frames_outside_a_session_are_not_detected() {
        let (detector, detections, _) = FakeDetector::new();
        let mut recorder = Recorder::spawn(detector).unwrap();

        recorder.push_frame(frame());
        assert!(detections.recv_timeout(SILENCE).is_err());

        let buffer = recorder.stop().block().unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn frames_after_stop_are_ignored() {
        let (detector, detections, _) = FakeDetector::new();
        let mut recorder = Recorder::spawn(detector).unwrap();

        recorder.start();
        recorder.push_frame(frame());
        detections.recv_timeout(TIMEOUT).unwrap();
        let buffer = recorder.stop().block().unwrap();
        assert_eq!(buffer.len(), 1);

        recorder.push_frame(frame());
        assert!(detections.recv_timeout(SILENCE).is_err());
    }

    #[test]
    fn failed_detections_drop_the_frame() {
        let (mut detector, detections, _) = FakeDetector::new();
        detector.fail = true;
        let mut recorder = Recorder::spawn(detector).unwrap();

        recorder.start();
        recorder.push_frame(frame());
        detections.recv_timeout(TIMEOUT).unwrap();

        let buffer = recorder.stop().block().unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn start_discards_the_previous_session() {
        let (detector, detections, _) = FakeDetector::new();
        let mut recorder = Recorder::spawn(detector).unwrap();

        recorder.start();
        recorder.push_frame(frame());
        detections.recv_timeout(TIMEOUT).unwrap();

        recorder.start();
        let buffer = recorder.stop().block().unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn thresholds_reach_the_detector() {
        let (detector, _, thresholds_rx) = FakeDetector::new();
        let mut recorder = Recorder::spawn(detector).unwrap();

        let mut thresholds = Thresholds::default();
        thresholds.min_hand_landmarks_confidence =
            Thresholds::step_up(thresholds.min_hand_landmarks_confidence);
        recorder.set_thresholds(thresholds);

        assert_eq!(thresholds_rx.recv_timeout(TIMEOUT).unwrap(), thresholds);
    }

    #[test]
    fn worker_panic_propagates_on_drop() {
        struct PanickingDetector {
            entered: Sender<()>,
        }

        impl Detector for PanickingDetector {
            fn detect(&mut self, _frame: &Frame) -> anyhow::Result<FrameLandmarks> {
                self.entered.send(()).ok();
                panic!("detector panic");
            }

            fn set_thresholds(&mut self, _thresholds: Thresholds) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let (entered, entered_rx) = unbounded();
        let mut recorder = Recorder::spawn(PanickingDetector { entered }).unwrap();
        recorder.start();
        recorder.push_frame(frame());
        entered_rx.recv_timeout(TIMEOUT).unwrap();
        catch_unwind(AssertUnwindSafe(|| drop(recorder))).unwrap_err();
    }

    #[test]
    fn detect_video_keeps_every_successful_frame() {
        let (mut detector, _, _) = FakeDetector::new();
        let buffer = detect_video(&mut detector, (0..7).map(|_| frame()));
        assert_eq!(buffer.len(), 7);
    }
}
