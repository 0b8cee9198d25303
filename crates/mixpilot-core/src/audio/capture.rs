//! Audio capture backends.
//!
//! [`CpalCapture`] opens a multi-channel input stream and deinterleaves
//! the callback data into one [`RingBuffer`] per channel. The stream is
//! owned by a dedicated thread because cpal streams are not `Send`; the
//! DSP thread only ever touches the rings via [`AudioCapture::consume`].
//!
//! [`NullCapture`] is the no-op fallback: the system degrades to
//! console-meter-only analysis when no audio device is available.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ring::RingBuffer;

/// Errors from the capture backend
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No input device found (id {0})")]
    DeviceNotFound(i32),

    #[error("Capture not opened")]
    NotOpen,

    #[error("Failed to build input stream: {0}")]
    StreamBuild(String),

    #[error("Failed to start input stream: {0}")]
    StreamPlay(String),

    #[error("Capture thread failed to start: {0}")]
    ThreadStart(String),
}

/// An available input device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub id: i32,
    pub name: String,
    pub max_input_channels: u16,
    pub default_sample_rate: u32,
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Input device index, -1 for the system default
    pub device_id: i32,
    /// Number of console channels to capture
    pub channel_count: usize,
    pub sample_rate: u32,
    /// Samples per analysis block (the FFT size)
    pub frames_per_block: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: -1,
            channel_count: 32,
            sample_rate: crate::types::DEFAULT_SAMPLE_RATE,
            frames_per_block: crate::types::DEFAULT_FFT_SIZE,
        }
    }
}

/// Abstract capture backend consumed by the DSP loop.
pub trait AudioCapture: Send {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CaptureError>;
    fn start(&mut self) -> Result<(), CaptureError>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;

    /// Drain buffered audio. For every channel with at least `frames`
    /// samples buffered, the callback receives `(channel_index_0_based,
    /// block)` with exactly `frames` deinterleaved samples. At most one
    /// block per channel per call; older backlog is discarded so the
    /// analysis always sees recent audio.
    fn consume(&mut self, frames: usize, cb: &mut dyn FnMut(usize, &[f32]));

    fn list_devices(&self) -> Vec<DeviceInfo>;
    fn backend_name(&self) -> &'static str;
}

// ── Null backend ─────────────────────────────────────────────────────

/// No-op capture: used when audio analysis is disabled or unavailable.
#[derive(Default)]
pub struct NullCapture;

impl AudioCapture for NullCapture {
    fn open(&mut self, _config: &CaptureConfig) -> Result<(), CaptureError> {
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn is_running(&self) -> bool {
        false
    }

    fn consume(&mut self, _frames: usize, _cb: &mut dyn FnMut(usize, &[f32])) {}

    fn list_devices(&self) -> Vec<DeviceInfo> {
        Vec::new()
    }

    fn backend_name(&self) -> &'static str {
        "null"
    }
}

// ── cpal backend ─────────────────────────────────────────────────────

/// Live capture through cpal.
pub struct CpalCapture {
    config: Option<CaptureConfig>,
    rings: Arc<Vec<RingBuffer>>,
    running: Arc<AtomicBool>,
    stop_tx: Option<flume::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    scratch: Vec<f32>,
}

impl CpalCapture {
    pub fn new() -> Self {
        Self {
            config: None,
            rings: Arc::new(Vec::new()),
            running: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            thread: None,
            scratch: Vec::new(),
        }
    }

    fn find_device(device_id: i32) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        if device_id < 0 {
            return host
                .default_input_device()
                .ok_or(CaptureError::DeviceNotFound(device_id));
        }
        host.input_devices()
            .map_err(|e| CaptureError::StreamBuild(e.to_string()))?
            .nth(device_id as usize)
            .ok_or(CaptureError::DeviceNotFound(device_id))
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCapture for CpalCapture {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CaptureError> {
        // Ring capacity of 8 blocks absorbs DSP-tick jitter before the
        // write path starts dropping
        let capacity = config.frames_per_block * 8;
        self.rings = Arc::new(
            (0..config.channel_count)
                .map(|_| RingBuffer::new(capacity))
                .collect(),
        );
        self.scratch = vec![0.0; config.frames_per_block];
        self.config = Some(config.clone());
        log::info!(
            "Capture opened: {} channels, {}Hz, {} frames/block",
            config.channel_count,
            config.sample_rate,
            config.frames_per_block
        );
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let config = self.config.clone().ok_or(CaptureError::NotOpen)?;
        let rings = self.rings.clone();
        let running = self.running.clone();

        let (stop_tx, stop_rx) = flume::bounded::<()>(1);
        let (ready_tx, ready_rx) = flume::bounded::<Result<(), CaptureError>>(1);

        // The stream must live on its own thread: cpal streams are not
        // Send, and the DSP thread only reads the rings.
        let thread = std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let device = match Self::find_device(config.device_id) {
                    Ok(d) => d,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                log::info!("Using input device: {}", device_name);

                let channels = config.channel_count as cpal::ChannelCount;
                let stream_config = cpal::StreamConfig {
                    channels,
                    sample_rate: cpal::SampleRate(config.sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                };

                // Deinterleave scratch is preallocated: the data callback
                // must not allocate
                let mut deint = vec![0.0f32; config.frames_per_block];
                let n_channels = config.channel_count;
                let cb_rings = rings.clone();

                let stream = device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                        let frames = data.len() / n_channels;
                        for ch in 0..n_channels {
                            let n = frames.min(deint.len());
                            for i in 0..n {
                                deint[i] = data[i * n_channels + ch];
                            }
                            // Overflow is silently dropped by the ring
                            cb_rings[ch].write(&deint[..n]);
                        }
                    },
                    |err| log::error!("Capture stream error: {}", err),
                    None,
                );

                let stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(CaptureError::StreamBuild(e.to_string())));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(CaptureError::StreamPlay(e.to_string())));
                    return;
                }

                running.store(true, Ordering::Release);
                let _ = ready_tx.send(Ok(()));

                // Park until stop; dropping the stream ends capture
                let _ = stop_rx.recv();
                running.store(false, Ordering::Release);
                drop(stream);
            })
            .map_err(|e| CaptureError::ThreadStart(e.to_string()))?;

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                log::info!("Audio capture running");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(CaptureError::ThreadStart("timed out waiting for stream".into())),
        }
    }

    fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.running.store(false, Ordering::Release);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn consume(&mut self, frames: usize, cb: &mut dyn FnMut(usize, &[f32])) {
        if frames > self.scratch.len() {
            self.scratch.resize(frames, 0.0);
        }
        for (ch, ring) in self.rings.iter().enumerate() {
            // Skip stale backlog so analysis tracks recent audio
            while ring.available() >= frames * 2 {
                ring.read(&mut self.scratch[..frames]);
            }
            if ring.available() >= frames {
                let n = ring.read(&mut self.scratch[..frames]);
                cb(ch, &self.scratch[..n]);
            }
        }
    }

    fn list_devices(&self) -> Vec<DeviceInfo> {
        let host = cpal::default_host();
        let Ok(devices) = host.input_devices() else {
            return Vec::new();
        };
        devices
            .enumerate()
            .filter_map(|(i, d)| {
                let name = d.name().ok()?;
                let cfg = d.default_input_config().ok()?;
                Some(DeviceInfo {
                    id: i as i32,
                    name,
                    max_input_channels: cfg.channels(),
                    default_sample_rate: cfg.sample_rate().0,
                })
            })
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "cpal"
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
