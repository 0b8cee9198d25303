//! Per-channel analysis and issue detection.
//!
//! Runs on the DSP thread every tick. With audio capture the analyser
//! sees real FFT results; without it, it falls back to console meter
//! data (RMS/peak only) and the FFT-dependent issues stay quiet.
//!
//! The issue detector is the "smart summary": the FFT runs locally and
//! only concise, actionable findings reach the LLM.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::audio::fft::FftResult;
use crate::console::state::ConsoleState;
use crate::types::{DB_FLOOR, SIGNAL_GATE_DB};

/// Peak above this is clipping territory
const CLIP_THRESHOLD_DB: f32 = -0.5;

/// Analysis of one channel for one tick.
#[derive(Debug, Clone)]
pub struct ChannelAnalysis {
    pub channel: usize,
    pub rms_db: f32,
    pub peak_db: f32,
    /// peak - rms (dB)
    pub crest_factor: f32,
    /// peak > -0.5 dBFS
    pub is_clipping: bool,
    /// Sustained narrow-band energy spike
    pub is_feedback_risk: bool,
    pub dominant_freq_hz: f32,
    pub spectral_centroid: f32,

    // Band energies (from FFT, or the console spectral slice)
    pub sub_bass: f32,
    pub bass: f32,
    pub low_mid: f32,
    pub mid: f32,
    pub upper_mid: f32,
    pub presence: f32,
    pub air: f32,

    /// True when populated from a real FFT
    pub has_fft_data: bool,
}

/// Whole-mix analysis for one tick.
#[derive(Debug, Clone, Default)]
pub struct MixAnalysis {
    pub channels: Vec<ChannelAnalysis>,
    pub main_rms_db: f32,
    pub main_peak_db: f32,
    pub main_clipping: bool,
    /// Human-readable warnings for the UI log
    pub warnings: Vec<String>,
    pub has_feedback_risk: bool,
    pub has_clipping: bool,
    pub clipping_channel: usize,
}

/// Actionable finding for LLM consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Clipping,
    FeedbackRisk,
    Masking,
    /// Excess low-mid energy
    Boomy,
    /// Excess upper-mid energy
    Harsh,
    /// Lacking presence relative to bass
    Thin,
    /// Excess bass buildup across the mix
    Muddy,
    /// Main bus close to clipping
    NoHeadroom,
}

impl IssueKind {
    pub fn as_wire(&self) -> &'static str {
        match self {
            IssueKind::Clipping => "clipping",
            IssueKind::FeedbackRisk => "feedback_risk",
            IssueKind::Masking => "masking",
            IssueKind::Boomy => "boomy",
            IssueKind::Harsh => "harsh",
            IssueKind::Thin => "thin",
            IssueKind::Muddy => "muddy",
            IssueKind::NoHeadroom => "no_headroom",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MixIssue {
    pub kind: IssueKind,
    pub channel: usize,
    /// Second channel for masking
    pub channel2: Option<usize>,
    /// Relevant frequency, 0 when not applicable
    pub freq_hz: f32,
    /// 0.0-1.0, how bad
    pub severity: f32,
    pub description: String,
}

#[derive(Default)]
pub struct AudioAnalyser {
    fft_results: Mutex<Vec<Option<FftResult>>>,
    has_fft_data: AtomicBool,
}

impl AudioAnalyser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a fresh FFT result for a channel (DSP thread, after each FFT).
    pub fn update_fft(&self, channel: usize, result: FftResult) {
        if channel < 1 {
            return;
        }
        let mut results = self.fft_results.lock().unwrap();
        if channel > results.len() {
            results.resize(channel, None);
        }
        results[channel - 1] = Some(result);
        self.has_fft_data.store(true, Ordering::Relaxed);
    }

    /// True once any real FFT data has arrived.
    pub fn has_fft_data(&self) -> bool {
        self.has_fft_data.load(Ordering::Relaxed)
    }

    /// Analyse every channel from the current console state, preferring
    /// FFT data where present.
    pub fn analyse(&self, state: &ConsoleState) -> MixAnalysis {
        let mut result = MixAnalysis {
            main_rms_db: DB_FLOOR,
            main_peak_db: DB_FLOOR,
            ..MixAnalysis::default()
        };

        let channel_count = state.channel_count();
        for ch in 1..=channel_count {
            let Some(snap) = state.channel(ch) else { continue };

            let fft = {
                let results = self.fft_results.lock().unwrap();
                results.get(ch - 1).copied().flatten().filter(|f| f.has_signal)
            };

            let mut ca = ChannelAnalysis {
                channel: ch,
                rms_db: snap.rms_db,
                peak_db: snap.peak_db,
                crest_factor: snap.peak_db - snap.rms_db,
                is_clipping: snap.peak_db > CLIP_THRESHOLD_DB,
                is_feedback_risk: false,
                dominant_freq_hz: snap.spectral.spectral_centroid,
                spectral_centroid: snap.spectral.spectral_centroid,
                sub_bass: DB_FLOOR,
                bass: snap.spectral.bass,
                low_mid: DB_FLOOR,
                mid: snap.spectral.mid,
                upper_mid: DB_FLOOR,
                presence: snap.spectral.presence,
                air: DB_FLOOR,
                has_fft_data: false,
            };

            if let Some(fft) = fft {
                ca.has_fft_data = true;
                ca.dominant_freq_hz = fft.dominant_freq_hz;
                ca.spectral_centroid = fft.spectral_centroid;
                ca.sub_bass = fft.bands.sub_bass;
                ca.bass = fft.bands.bass;
                ca.low_mid = fft.bands.low_mid;
                ca.mid = fft.bands.mid;
                ca.upper_mid = fft.bands.upper_mid;
                ca.presence = fft.bands.presence;
                ca.air = fft.bands.air;
                // FFT-derived levels are tighter than console meters
                if fft.rms_db > DB_FLOOR + 1.0 {
                    ca.rms_db = fft.rms_db;
                    ca.peak_db = fft.peak_db;
                    ca.crest_factor = fft.crest_factor;
                    ca.is_clipping = fft.peak_db > CLIP_THRESHOLD_DB;
                }

                // Feedback: a loud, nearly sinusoidal tone. Low crest
                // factor (peak close to RMS) is the tell.
                if ca.rms_db > -12.0 && ca.crest_factor < 3.0 {
                    ca.is_feedback_risk = true;
                    result.has_feedback_risk = true;
                    result.warnings.push(format!(
                        "Feedback risk ch{} @{}Hz (crest={}dB)",
                        ch, ca.dominant_freq_hz as i32, ca.crest_factor as i32
                    ));
                }
            } else {
                // Meter-only heuristic; console meters smooth harder, so
                // the level gate sits higher
                if snap.rms_db > -10.0 && ca.crest_factor < 3.0 {
                    ca.is_feedback_risk = true;
                    result.has_feedback_risk = true;
                    result.warnings.push(format!("Possible feedback ch{}", ch));
                }
            }

            if ca.is_clipping {
                result.has_clipping = true;
                result.clipping_channel = ch;
                result
                    .warnings
                    .push(format!("Clipping ch{} (peak={}dBFS)", ch, ca.peak_db as i32));
            }

            result.channels.push(ca);
        }

        result
    }

    /// Convert spectral analysis into the small vocabulary of findings
    /// the LLM acts on. All thresholds are deliberate; see tests.
    pub fn detect_issues(&self, analysis: &MixAnalysis) -> Vec<MixIssue> {
        let mut issues = Vec::new();

        for ch in &analysis.channels {
            if ch.rms_db < SIGNAL_GATE_DB {
                continue;
            }

            if ch.is_clipping {
                issues.push(MixIssue {
                    kind: IssueKind::Clipping,
                    channel: ch.channel,
                    channel2: None,
                    freq_hz: 0.0,
                    severity: ((ch.peak_db + 3.0) / 3.0).clamp(0.0, 1.0),
                    description: format!("ch{} clipping (peak {:.1}dB)", ch.channel, ch.peak_db),
                });
            }

            if ch.is_feedback_risk {
                issues.push(MixIssue {
                    kind: IssueKind::FeedbackRisk,
                    channel: ch.channel,
                    channel2: None,
                    freq_hz: ch.dominant_freq_hz,
                    severity: ((-ch.crest_factor + 6.0) / 6.0).clamp(0.0, 1.0),
                    description: format!(
                        "ch{} feedback risk @{}Hz",
                        ch.channel, ch.dominant_freq_hz as i32
                    ),
                });
            }

            // Tonal issues need real spectral data
            if !ch.has_fft_data {
                continue;
            }

            if ch.low_mid > -12.0 && ch.low_mid > ch.mid + 6.0 {
                issues.push(MixIssue {
                    kind: IssueKind::Boomy,
                    channel: ch.channel,
                    channel2: None,
                    freq_hz: 350.0,
                    severity: ((ch.low_mid + 6.0) / 12.0).clamp(0.0, 1.0),
                    description: format!("ch{} boomy (low-mid {:.1}dB)", ch.channel, ch.low_mid),
                });
            }

            if ch.upper_mid > -10.0 && ch.upper_mid > ch.mid + 4.0 {
                issues.push(MixIssue {
                    kind: IssueKind::Harsh,
                    channel: ch.channel,
                    channel2: None,
                    freq_hz: 3500.0,
                    severity: ((ch.upper_mid + 6.0) / 12.0).clamp(0.0, 1.0),
                    description: format!(
                        "ch{} harsh (upper-mid {:.1}dB)",
                        ch.channel, ch.upper_mid
                    ),
                });
            }

            if ch.presence < -30.0 && ch.bass > -15.0 && ch.bass - ch.presence > 15.0 {
                issues.push(MixIssue {
                    kind: IssueKind::Thin,
                    channel: ch.channel,
                    channel2: None,
                    freq_hz: 5000.0,
                    severity: ((ch.bass - ch.presence) / 20.0).clamp(0.0, 1.0),
                    description: format!("ch{} thin (presence {:.1}dB)", ch.channel, ch.presence),
                });
            }
        }

        // Masking: every pair of active channels with spectral data
        for i in 0..analysis.channels.len() {
            let a = &analysis.channels[i];
            if a.rms_db < -40.0 || !a.has_fft_data {
                continue;
            }
            for b in &analysis.channels[i + 1..] {
                if b.rms_db < -40.0 || !b.has_fft_data {
                    continue;
                }
                issues.extend(check_masking(a, b));
            }
        }

        issues
    }
}

/// Band overlap checks for a channel pair. One issue per triggered band.
fn check_masking(a: &ChannelAnalysis, b: &ChannelAnalysis) -> Vec<MixIssue> {
    let mut issues = Vec::new();

    let mut push = |freq_hz: f32, overlap_db: f32| {
        issues.push(MixIssue {
            kind: IssueKind::Masking,
            channel: a.channel,
            channel2: Some(b.channel),
            freq_hz,
            severity: ((overlap_db + 12.0) / 12.0).clamp(0.0, 1.0),
            description: format!(
                "ch{} & ch{} masking @{}Hz",
                a.channel, b.channel, freq_hz as i32
            ),
        });
    };

    // Kick vs bass guitar territory
    let bass_overlap = a.bass.min(b.bass);
    if bass_overlap >= -15.0 && (a.bass - b.bass).abs() < 6.0 {
        push(200.0, bass_overlap);
    }

    // Guitar vs keys
    let low_mid_overlap = a.low_mid.min(b.low_mid);
    if low_mid_overlap >= -12.0 && (a.low_mid - b.low_mid).abs() < 5.0 {
        push(400.0, low_mid_overlap);
    }

    // Guitar vs vocal
    let mid_overlap = a.mid.min(b.mid);
    if mid_overlap >= -12.0 && (a.mid - b.mid).abs() < 4.0 {
        push(2000.0, mid_overlap);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fft::{BandEnergy, FftResult};

    fn state_with_meters(count: usize, meters: &[(usize, f32, f32)]) -> ConsoleState {
        let state = ConsoleState::new();
        state.init(count, 4);
        for &(ch, rms, peak) in meters {
            state.update_meter(ch, rms, peak);
        }
        state
    }

    fn fft_result(bands: BandEnergy, rms: f32, peak: f32, dominant: f32) -> FftResult {
        FftResult {
            bands,
            spectral_centroid: dominant,
            dominant_freq_hz: dominant,
            rms_db: rms,
            peak_db: peak,
            crest_factor: peak - rms,
            has_signal: true,
        }
    }

    fn flat_bands(level: f32) -> BandEnergy {
        BandEnergy {
            sub_bass: level,
            bass: level,
            low_mid: level,
            mid: level,
            upper_mid: level,
            presence: level,
            air: level,
        }
    }

    #[test]
    fn test_silent_channels_produce_no_issues() {
        let analyser = AudioAnalyser::new();
        let state = state_with_meters(4, &[]);
        let analysis = analyser.analyse(&state);
        assert!(!analysis.has_clipping);
        assert!(analyser.detect_issues(&analysis).is_empty());
    }

    #[test]
    fn test_clipping_detected_from_meters() {
        let analyser = AudioAnalyser::new();
        let state = state_with_meters(4, &[(2, -3.0, 0.2)]);
        let analysis = analyser.analyse(&state);

        assert!(analysis.has_clipping);
        assert_eq!(analysis.clipping_channel, 2);

        let issues = analyser.detect_issues(&analysis);
        let clip = issues.iter().find(|i| i.kind == IssueKind::Clipping).unwrap();
        assert_eq!(clip.channel, 2);
        // severity = (0.2 + 3) / 3, clamped
        assert!((clip.severity - 1.0).abs() < 0.07);
    }

    #[test]
    fn test_clipping_at_zero_dbfs() {
        let analyser = AudioAnalyser::new();
        let state = state_with_meters(2, &[(1, -6.0, 0.0)]);
        let analysis = analyser.analyse(&state);
        let issues = analyser.detect_issues(&analysis);
        assert!(issues.iter().any(|i| i.kind == IssueKind::Clipping));
    }

    #[test]
    fn test_feedback_risk_from_fft() {
        let analyser = AudioAnalyser::new();
        let state = state_with_meters(4, &[(4, -9.0, -6.0)]);

        // 2kHz sine at -9 dBFS RMS: crest ~3dB
        analyser.update_fft(4, fft_result(flat_bands(-40.0), -9.0, -6.1, 2000.0));

        let analysis = analyser.analyse(&state);
        let ch = &analysis.channels[3];
        assert!(ch.is_feedback_risk);

        let issues = analyser.detect_issues(&analysis);
        let fb = issues.iter().find(|i| i.kind == IssueKind::FeedbackRisk).unwrap();
        assert_eq!(fb.channel, 4);
        assert!((fb.freq_hz - 2000.0).abs() < 1.0);
    }

    #[test]
    fn test_feedback_heuristic_without_fft() {
        let analyser = AudioAnalyser::new();
        // Loud and flat: rms -8, peak -6 => crest 2
        let state = state_with_meters(4, &[(1, -8.0, -6.0)]);
        let analysis = analyser.analyse(&state);
        assert!(analysis.channels[0].is_feedback_risk);

        // Same crest but quieter than the -10dB meter gate
        let state = state_with_meters(4, &[(1, -11.0, -9.0)]);
        let analysis = analyser.analyse(&state);
        assert!(!analysis.channels[0].is_feedback_risk);
    }

    #[test]
    fn test_balanced_channel_has_no_tonal_issues() {
        let analyser = AudioAnalyser::new();
        let state = state_with_meters(2, &[(1, -20.0, -8.0)]);
        analyser.update_fft(1, fft_result(flat_bands(-20.0), -20.0, -8.0, 500.0));

        let analysis = analyser.analyse(&state);
        let issues = analyser.detect_issues(&analysis);
        assert!(
            !issues.iter().any(|i| matches!(
                i.kind,
                IssueKind::Boomy | IssueKind::Harsh | IssueKind::Thin | IssueKind::Masking
            )),
            "unexpected issues: {:?}",
            issues
        );
    }

    #[test]
    fn test_boomy_detection() {
        let analyser = AudioAnalyser::new();
        let state = state_with_meters(2, &[(1, -18.0, -6.0)]);
        let mut bands = flat_bands(-30.0);
        bands.low_mid = -8.0; // > -12 and > mid + 6
        analyser.update_fft(1, fft_result(bands, -18.0, -6.0, 350.0));

        let analysis = analyser.analyse(&state);
        let issues = analyser.detect_issues(&analysis);
        let boomy = issues.iter().find(|i| i.kind == IssueKind::Boomy).unwrap();
        assert_eq!(boomy.freq_hz, 350.0);
        assert!(boomy.severity > 0.0);
    }

    #[test]
    fn test_harsh_detection() {
        let analyser = AudioAnalyser::new();
        let state = state_with_meters(2, &[(1, -18.0, -6.0)]);
        let mut bands = flat_bands(-30.0);
        bands.upper_mid = -8.0;
        analyser.update_fft(1, fft_result(bands, -18.0, -6.0, 3000.0));

        let analysis = analyser.analyse(&state);
        let issues = analyser.detect_issues(&analysis);
        let harsh = issues.iter().find(|i| i.kind == IssueKind::Harsh).unwrap();
        assert_eq!(harsh.freq_hz, 3500.0);
    }

    #[test]
    fn test_thin_detection() {
        let analyser = AudioAnalyser::new();
        let state = state_with_meters(2, &[(1, -18.0, -6.0)]);
        let mut bands = flat_bands(-20.0);
        bands.bass = -10.0;
        bands.presence = -35.0;
        analyser.update_fft(1, fft_result(bands, -18.0, -6.0, 200.0));

        let analysis = analyser.analyse(&state);
        let issues = analyser.detect_issues(&analysis);
        let thin = issues.iter().find(|i| i.kind == IssueKind::Thin).unwrap();
        assert_eq!(thin.freq_hz, 5000.0);
    }

    #[test]
    fn test_masking_between_bass_heavy_channels() {
        let analyser = AudioAnalyser::new();
        let state = state_with_meters(4, &[(1, -15.0, -5.0), (2, -14.0, -5.0)]);

        let mut bands_a = flat_bands(-40.0);
        bands_a.bass = -10.0;
        let mut bands_b = flat_bands(-40.0);
        bands_b.bass = -12.0;
        analyser.update_fft(1, fft_result(bands_a, -15.0, -5.0, 100.0));
        analyser.update_fft(2, fft_result(bands_b, -14.0, -5.0, 110.0));

        let analysis = analyser.analyse(&state);
        let issues = analyser.detect_issues(&analysis);
        let mask = issues.iter().find(|i| i.kind == IssueKind::Masking).unwrap();
        assert_eq!(mask.channel, 1);
        assert_eq!(mask.channel2, Some(2));
        assert_eq!(mask.freq_hz, 200.0);
    }

    #[test]
    fn test_feedback_tone_through_ring_and_fft() {
        // A loud 2kHz tone ringing into limiting (as feedback does),
        // fed through the capture ring: the analyser should flag
        // channel 4 as a feedback risk near 2kHz
        use crate::audio::fft::FftAnalyser;
        use crate::audio::ring::RingBuffer;

        let ring = RingBuffer::new(4096);
        let samples: Vec<f32> = (0..1024)
            .map(|i| {
                let s = 0.6 * (2.0 * std::f32::consts::PI * 2000.0 * i as f32 / 48_000.0).sin();
                s.clamp(-0.5, 0.5)
            })
            .collect();
        assert_eq!(ring.write(&samples), 1024);

        let mut block = vec![0.0f32; 1024];
        assert_eq!(ring.read(&mut block), 1024);

        let mut fft = FftAnalyser::new(1024);
        let result = fft.analyse(&block, 48_000.0);
        assert!(result.has_signal);
        assert!(result.rms_db > -12.0, "rms {}", result.rms_db);
        assert!(result.crest_factor < 3.0, "crest {}", result.crest_factor);

        let analyser = AudioAnalyser::new();
        let state = state_with_meters(4, &[(4, -9.0, -6.0)]);
        analyser.update_fft(4, result);

        let analysis = analyser.analyse(&state);
        let issues = analyser.detect_issues(&analysis);
        let fb = issues.iter().find(|i| i.kind == IssueKind::FeedbackRisk).unwrap();
        assert_eq!(fb.channel, 4);
        assert!((fb.freq_hz - 2000.0).abs() < 60.0, "freq {}", fb.freq_hz);
        // Advisory only: nothing here proposes an action
    }

    #[test]
    fn test_no_fft_means_no_tonal_issues() {
        let analyser = AudioAnalyser::new();
        // Loud channel, no FFT: spectral slice at default floor
        let state = state_with_meters(2, &[(1, -20.0, -5.0)]);
        let analysis = analyser.analyse(&state);
        let issues = analyser.detect_issues(&analysis);
        assert!(!issues
            .iter()
            .any(|i| matches!(i.kind, IssueKind::Boomy | IssueKind::Harsh | IssueKind::Thin)));
        assert!(!analyser.has_fft_data());
    }
}
