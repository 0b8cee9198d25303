//! Audio capture and spectral analysis.
//!
//! The audio callback thread writes into per-channel [`ring::RingBuffer`]s
//! and never allocates, locks or blocks. The DSP thread drains the rings
//! and runs the [`fft::FftAnalyser`] once per channel per tick.

pub mod capture;
pub mod fft;
pub mod ring;

pub use capture::{AudioCapture, CaptureConfig, CaptureError, CpalCapture, DeviceInfo, NullCapture};
pub use fft::{BandEnergy, FftAnalyser, FftResult};
pub use ring::RingBuffer;
