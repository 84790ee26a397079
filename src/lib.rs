//! Finger painting in the air.
//!
//! A hand landmark estimator observes the user's hand in a mirrored webcam feed. Raising only the
//! index finger draws, raising index and middle finger erases, and any other pose lifts the brush.
//! Strokes accumulate on a persistent [`Canvas`][stroke::StrokeEngine::canvas] that is composited
//! over every live frame.
//!
//! The per-frame pipeline is driven by [`session::Session`]:
//!
//! 1. [`hand::LandmarkProvider`] estimates hand keypoints in the frame.
//! 2. [`gesture::classify`] turns the first hand into a [`gesture::DrawMode`] and a cursor.
//! 3. [`stroke::StrokeEngine`] extends, erases or ends the current stroke on the canvas.
//! 4. [`image::composite`] lays the canvas over the live frame.
//!
//! # Environment Variables
//!
//! The `fingerpaint` binary reads the following environment variables:
//!
//! * `FINGERPAINT_HAND_MODEL`: Path to the ONNX hand landmark network used by
//!   [`OnnxLandmarker`][hand::landmark::OnnxLandmarker]. Required.
//! * `FINGERPAINT_WEBCAM_NAME`: Forces the device to use for [`Webcam`]s created without an
//!   explicit device name. If unset, the first device that supports a compatible image format will
//!   be used.
//! * `RUST_LOG`: Standard [env_logger] filter directives, applied on top of the defaults set by
//!   [`init_logger!`].
//!
//! [env_logger]: https://docs.rs/env_logger
//! [`Webcam`]: video::webcam::Webcam

use log::LevelFilter;

pub mod gesture;
pub mod gui;
pub mod hand;
pub mod image;
pub mod session;
pub mod stroke;
pub mod timer;
pub mod video;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this library will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// `tract` will always log at *warn* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
