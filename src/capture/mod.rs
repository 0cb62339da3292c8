//! Capture sources and outbound framing
//!
//! Device access lives behind the [`CaptureSource`]/[`VideoSource`] traits
//! so the session engine never owns platform specifics. The shipped
//! implementation streams WAV files (batch runs, tests); embedders supply
//! microphone/camera sources through [`CaptureFactory`].

pub mod pipeline;
pub mod source;

pub use pipeline::FrameAssembler;
pub use source::{
    CaptureConfig, CaptureFactory, CaptureSource, VideoSource, WavCaptureFactory, WavFileSource,
};
