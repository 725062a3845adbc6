//! Sign language recognition pipeline.
//!
//! This crate contains the model-independent parts of a sign language
//! recognizer: it buffers per-frame holistic landmark records while the user
//! records a gesture, crops the recording to the interval where hands are
//! actually visible, and feeds the result to a sequence classifier that
//! yields the 3 most likely sign labels.
//!
//! The heavy lifting – holistic landmark detection and sequence
//! classification – is delegated to collaborator networks behind the
//! [`Detector`][detector::Detector] and [`Network`][classify::Network]
//! traits, so everything in here can be exercised without a real model.
//!
//! # Coordinates
//!
//! Landmark positions are in normalized image space: X and Y are roughly in
//! range 0 to 1 inside the image (points slightly outside are possible), Z is
//! depth relative to the detected body. A landmark that was not detected in a
//! frame has all 3 coordinates set to NaN.

use log::LevelFilter;

pub mod capture;
pub mod classify;
pub mod detector;
pub mod iter;
pub mod landmark;
pub mod nn;
pub mod num;
pub mod pipeline;
pub mod recording;
pub mod timer;
pub mod window;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and signsense will log at *debug* level; everything else
/// defaults to the `RUST_LOG` environment variable.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
