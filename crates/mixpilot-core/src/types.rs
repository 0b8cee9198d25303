//! Common types and dB helpers used throughout mixpilot.

/// Default sample rate (48kHz - standard professional audio rate)
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Default FFT / capture block size in frames
pub const DEFAULT_FFT_SIZE: usize = 1024;

/// Floor value for dBFS conversions (silence)
pub const DB_FLOOR: f32 = -96.0;

/// Channels with RMS at or below this are treated as carrying no signal
pub const SIGNAL_GATE_DB: f32 = -60.0;

/// Convert a linear amplitude to dBFS, clamped to [`DB_FLOOR`]
#[inline]
pub fn to_dbfs(linear: f32) -> f32 {
    if linear < 1e-10 {
        DB_FLOOR
    } else {
        20.0 * linear.log10()
    }
}

/// Round to a fixed number of decimals (for JSON output)
#[inline]
pub fn round_to(value: f32, decimals: i32) -> f32 {
    let mult = 10.0_f32.powi(decimals);
    (value * mult).round() / mult
}
