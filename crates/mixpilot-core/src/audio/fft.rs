//! Windowed radix-2 FFT analyser.
//!
//! Self-contained (no FFT crate) so the analyser can run anywhere the
//! capture backend does. Operates on real-valued blocks and extracts
//! per-band energies, spectral centroid, dominant frequency and crest
//! factor. One magnitude vector of N/2 floats is the only allocation
//! per call.

use crate::types::{to_dbfs, DB_FLOOR, SIGNAL_GATE_DB};

/// Energy per frequency band, in dBFS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandEnergy {
    /// 20-80 Hz
    pub sub_bass: f32,
    /// 80-250 Hz
    pub bass: f32,
    /// 250-500 Hz
    pub low_mid: f32,
    /// 500-2k Hz
    pub mid: f32,
    /// 2k-6k Hz
    pub upper_mid: f32,
    /// 6k-10k Hz
    pub presence: f32,
    /// 10k-20k Hz
    pub air: f32,
}

impl Default for BandEnergy {
    fn default() -> Self {
        Self {
            sub_bass: DB_FLOOR,
            bass: DB_FLOOR,
            low_mid: DB_FLOOR,
            mid: DB_FLOOR,
            upper_mid: DB_FLOOR,
            presence: DB_FLOOR,
            air: DB_FLOOR,
        }
    }
}

/// Result of analysing one block of samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FftResult {
    pub bands: BandEnergy,
    /// Magnitude-weighted mean frequency in Hz
    pub spectral_centroid: f32,
    /// Frequency of the strongest bin in Hz
    pub dominant_freq_hz: f32,
    pub rms_db: f32,
    pub peak_db: f32,
    /// peak - rms in dB; low values indicate a nearly sinusoidal signal
    pub crest_factor: f32,
    /// RMS above the -60 dBFS gate
    pub has_signal: bool,
}

impl Default for FftResult {
    fn default() -> Self {
        Self {
            bands: BandEnergy::default(),
            spectral_centroid: 0.0,
            dominant_freq_hz: 0.0,
            rms_db: DB_FLOOR,
            peak_db: DB_FLOOR,
            crest_factor: 0.0,
            has_signal: false,
        }
    }
}

/// Radix-2 Cooley-Tukey analyser with a pre-computed Hann window.
pub struct FftAnalyser {
    fft_size: usize,
    window: Vec<f32>,
    real: Vec<f32>,
    imag: Vec<f32>,
}

impl FftAnalyser {
    /// `fft_size` must be a power of two.
    pub fn new(fft_size: usize) -> Self {
        assert!(fft_size.is_power_of_two(), "FFT size must be a power of two");
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (fft_size - 1) as f32).cos())
            })
            .collect();
        Self {
            fft_size,
            window,
            real: vec![0.0; fft_size],
            imag: vec![0.0; fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Analyse one block. Returns a default result with `has_signal=false`
    /// when the block is too short or below the silence gate.
    pub fn analyse(&mut self, samples: &[f32], sample_rate: f32) -> FftResult {
        let mut r = FftResult::default();

        if samples.len() < self.fft_size || sample_rate <= 0.0 {
            return r;
        }

        // Time-domain RMS and peak over the whole block
        let mut sum_sq = 0.0f32;
        let mut peak = 0.0f32;
        for &s in samples {
            sum_sq += s * s;
            let a = s.abs();
            if a > peak {
                peak = a;
            }
        }
        let rms = (sum_sq / samples.len() as f32).sqrt();
        r.rms_db = to_dbfs(rms);
        r.peak_db = to_dbfs(peak);
        r.crest_factor = r.peak_db - r.rms_db;
        r.has_signal = r.rms_db > SIGNAL_GATE_DB;

        if !r.has_signal {
            return r;
        }

        // Window into the work buffers
        for i in 0..self.fft_size {
            self.real[i] = samples[i] * self.window[i];
            self.imag[i] = 0.0;
        }

        fft_in_place(&mut self.real, &mut self.imag);

        // Magnitude spectrum up to Nyquist, scaled by 1/(N/2)
        let half_n = self.fft_size / 2;
        let bin_width = sample_rate / self.fft_size as f32;
        let scale = 1.0 / half_n as f32;
        let magnitude: Vec<f32> = (0..half_n)
            .map(|i| (self.real[i] * self.real[i] + self.imag[i] * self.imag[i]).sqrt() * scale)
            .collect();

        r.bands.sub_bass = band_energy_db(&magnitude, bin_width, 20.0, 80.0);
        r.bands.bass = band_energy_db(&magnitude, bin_width, 80.0, 250.0);
        r.bands.low_mid = band_energy_db(&magnitude, bin_width, 250.0, 500.0);
        r.bands.mid = band_energy_db(&magnitude, bin_width, 500.0, 2000.0);
        r.bands.upper_mid = band_energy_db(&magnitude, bin_width, 2000.0, 6000.0);
        r.bands.presence = band_energy_db(&magnitude, bin_width, 6000.0, 10_000.0);
        r.bands.air = band_energy_db(&magnitude, bin_width, 10_000.0, sample_rate / 2.0);

        // Spectral centroid over bins 1..N/2 (skip DC)
        let mut weighted = 0.0f32;
        let mut total = 0.0f32;
        for (i, &m) in magnitude.iter().enumerate().skip(1) {
            weighted += i as f32 * bin_width * m;
            total += m;
        }
        r.spectral_centroid = if total > 1e-12 { weighted / total } else { 0.0 };

        // Dominant frequency: strongest non-DC bin
        let peak_bin = magnitude
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        r.dominant_freq_hz = peak_bin as f32 * bin_width;

        r
    }
}

/// RMS of the magnitude bins covering [lo_hz, hi_hz], in dBFS.
fn band_energy_db(magnitude: &[f32], bin_width: f32, lo_hz: f32, hi_hz: f32) -> f32 {
    let lo_bin = ((lo_hz / bin_width) as usize).max(1);
    let hi_bin = ((hi_hz / bin_width) as usize).min(magnitude.len().saturating_sub(1));
    if lo_bin > hi_bin {
        return DB_FLOOR;
    }

    let sum_sq: f32 = magnitude[lo_bin..=hi_bin].iter().map(|m| m * m).sum();
    let rms = (sum_sq / (hi_bin - lo_bin + 1) as f32).sqrt();
    to_dbfs(rms)
}

/// In-place radix-2 Cooley-Tukey FFT.
fn fft_in_place(real: &mut [f32], imag: &mut [f32]) {
    let n = real.len();

    // Bit-reversal permutation
    let mut j = 0usize;
    for i in 0..n.saturating_sub(1) {
        if i < j {
            real.swap(i, j);
            imag.swap(i, j);
        }
        let mut m = n >> 1;
        while m >= 1 && j >= m {
            j -= m;
            m >>= 1;
        }
        j += m;
    }

    // Butterflies
    let mut step = 2;
    while step <= n {
        let half_step = step >> 1;
        let angle = -2.0 * std::f32::consts::PI / step as f32;

        let mut group = 0;
        while group < n {
            for pair in 0..half_step {
                let (tw_re, tw_im) = {
                    let a = angle * pair as f32;
                    (a.cos(), a.sin())
                };

                let even = group + pair;
                let odd = even + half_step;

                let t_re = tw_re * real[odd] - tw_im * imag[odd];
                let t_im = tw_re * imag[odd] + tw_im * real[odd];

                real[odd] = real[even] - t_re;
                imag[odd] = imag[even] - t_im;
                real[even] += t_re;
                imag[even] += t_im;
            }
            group += step;
        }
        step <<= 1;
    }
}
