//! Discovery pipeline: sync, fingerprint, classify, pair, review.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::console::adapter::ConsoleAdapter;
use crate::console::state::ConsoleState;
use crate::llm::engine::DecisionEngine;
use crate::types::SIGNAL_GATE_DB;

use super::channel_map::ChannelMap;
use super::names::NameClassifier;
use super::pairs::StereoPairDetector;
use super::profile::{ChannelProfile, Confidence, Fingerprint};
use super::review::DiscoveryReview;
use super::spectral::SpectralClassifier;
use super::sync::{perform_full_sync, SyncProgress};

/// Spectral result must match at least this well to override a generic name
const SPECTRAL_ADOPT_SCORE: f32 = 0.6;

/// How long to let the console answer a full sync
const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

/// Audio settle time between sync and fingerprint capture
const SETTLE_TIME: Duration = Duration::from_millis(500);

pub struct DiscoveryOrchestrator {
    adapter: Arc<dyn ConsoleAdapter>,
    state: Arc<ConsoleState>,
    channel_map: Arc<ChannelMap>,
    llm: Option<Arc<DecisionEngine>>,
    sync_progress: Arc<SyncProgress>,
    name_classifier: NameClassifier,
    spectral_classifier: SpectralClassifier,
    pair_detector: StereoPairDetector,
}

impl DiscoveryOrchestrator {
    pub fn new(
        adapter: Arc<dyn ConsoleAdapter>,
        state: Arc<ConsoleState>,
        channel_map: Arc<ChannelMap>,
        llm: Option<Arc<DecisionEngine>>,
        sync_progress: Arc<SyncProgress>,
    ) -> Self {
        Self {
            adapter,
            state,
            channel_map,
            llm,
            sync_progress,
            name_classifier: NameClassifier::new(),
            spectral_classifier: SpectralClassifier::new(),
            pair_detector: StereoPairDetector::new(),
        }
    }

    pub fn run(&self) {
        let caps = self.adapter.capabilities();
        log::info!("=== Starting channel discovery ===");
        log::info!(
            "Console: {} ({} channels, {} buses)",
            caps.model,
            caps.channel_count,
            caps.bus_count
        );

        // 1. Full state sync
        let expected = caps.channel_count + caps.bus_count;
        if !perform_full_sync(&*self.adapter, &self.sync_progress, expected, SYNC_TIMEOUT) {
            log::warn!("Partial sync - some channels may be missing data");
        }

        // 2. Let audio settle before fingerprinting
        std::thread::sleep(SETTLE_TIME);

        // 3-6. Build profiles from current state
        let mut profiles = Vec::with_capacity(caps.channel_count);
        for ch in 1..=caps.channel_count {
            let Some(snapshot) = self.state.channel(ch) else {
                continue;
            };

            let mut profile = ChannelProfile::new(ch);
            profile.console_name = snapshot.name.clone();
            profile.normalised_name = snapshot.name.trim().to_lowercase();
            profile.fader_norm = snapshot.fader;
            profile.muted = snapshot.muted;
            profile.gain_db = snapshot.gain_db;
            profile.phantom_power = snapshot.phantom;
            profile.phase_invert = snapshot.phase;
            profile.high_pass_hz = snapshot.hpf_freq;
            profile.fingerprint = capture_fingerprint(&snapshot);
            profile.discovered_at = Instant::now();

            // Name classification first: fast and local
            let by_name = self.name_classifier.classify(&snapshot.name);
            profile.role = by_name.role;
            profile.group = by_name.group;
            profile.confidence = by_name.confidence;

            // Spectral second opinion when the name gives nothing away
            if profile.confidence <= Confidence::Low && profile.fingerprint.has_signal {
                let by_spectrum = self.spectral_classifier.classify(&profile.fingerprint);
                if by_spectrum.match_score >= SPECTRAL_ADOPT_SCORE {
                    log::debug!(
                        "ch{} '{}': spectral -> {} ({:.0}%)",
                        ch,
                        snapshot.name,
                        by_spectrum.role.as_str(),
                        by_spectrum.match_score * 100.0
                    );
                    profile.role = by_spectrum.role;
                    profile.group = by_spectrum.group;
                    profile.confidence = Confidence::Medium;
                }
            }

            profiles.push(profile);
        }

        // 7. Stereo pair detection
        for pair in self.pair_detector.detect(&profiles) {
            if let Some(p) = profiles.iter_mut().find(|p| p.index == pair.left) {
                p.stereo_pair = Some(pair.right);
            }
            if let Some(p) = profiles.iter_mut().find(|p| p.index == pair.right) {
                p.stereo_pair = Some(pair.left);
            }
            log::info!(
                "Detected stereo pair: ch{} / ch{} ({:.0}%)",
                pair.left,
                pair.right,
                pair.confidence * 100.0
            );
        }

        // 8. Commit local classification immediately
        for profile in &profiles {
            self.channel_map.update_profile(profile.clone());
        }
        log::info!("=== Discovery complete (local) ===");
        self.log_channel_map();

        // 9. LLM review pass, off-thread so it never blocks the show
        if let Some(llm) = self.llm.clone() {
            let channel_map = self.channel_map.clone();
            let spawn = std::thread::Builder::new()
                .name("discovery-review".into())
                .spawn(move || {
                    log::info!("Starting LLM discovery review...");
                    match DiscoveryReview::new(llm).review(profiles) {
                        Ok(reviewed) => {
                            for p in reviewed {
                                channel_map.update_profile(p);
                            }
                            log::info!("LLM discovery review complete");
                        }
                        Err(e) => {
                            log::warn!(
                                "LLM discovery review failed: {} - keeping local classification",
                                e
                            );
                        }
                    }
                });
            if let Err(e) = spawn {
                log::warn!("Could not spawn discovery review thread: {}", e);
            }
        }
    }

    fn log_channel_map(&self) {
        log::info!("Channel map:");
        for p in self.channel_map.all() {
            if p.console_name.is_empty() && !p.fingerprint.has_signal {
                continue;
            }
            let pair = p
                .stereo_pair
                .map(|other| format!(" -> pair ch{}", other))
                .unwrap_or_default();
            log::info!(
                "  ch{:02}  {:<12}  {:<16}  {}{}",
                p.index,
                if p.console_name.is_empty() { "(unnamed)" } else { p.console_name.as_str() },
                p.role.as_str(),
                p.confidence.as_str(),
                pair
            );
        }
    }
}

/// Build a fingerprint from the channel's current console state.
fn capture_fingerprint(snapshot: &crate::console::state::ChannelSnapshot) -> Fingerprint {
    let spectral = &snapshot.spectral;
    let mut fp = Fingerprint {
        average_rms: snapshot.rms_db,
        has_signal: snapshot.rms_db > SIGNAL_GATE_DB,
        bass_energy: spectral.bass,
        mid_energy: spectral.mid,
        presence_energy: spectral.presence,
        crest_factor: spectral.crest_factor,
        is_percussive: spectral.crest_factor > 10.0,
        dominant_freq_hz: spectral.spectral_centroid,
        spectral_centroid: spectral.spectral_centroid,
        ..Fingerprint::default()
    };

    // Shape flags from the bands we have: broadband when everything is
    // within 12dB of the loudest band, narrowband when only one is
    let bands = [fp.bass_energy, fp.mid_energy, fp.presence_energy];
    let max_band = bands.iter().cloned().fold(f32::MIN, f32::max);
    let near = bands.iter().filter(|&&b| max_band - b <= 12.0).count();
    fp.is_broadband = fp.has_signal && near == bands.len();
    fp.is_narrowband = fp.has_signal && near == 1;

    fp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::state::{ChannelSnapshot, ConsoleState, SpectralData};

    fn snapshot_with(rms: f32, bass: f32, mid: f32, presence: f32, crest: f32) -> ChannelSnapshot {
        let state = ConsoleState::new();
        state.init(1, 1);
        state.update_meter(1, rms, rms + crest);
        state.update_spectral(
            1,
            SpectralData { bass, mid, presence, crest_factor: crest, spectral_centroid: 500.0 },
        );
        state.channel(1).unwrap()
    }

    #[test]
    fn test_fingerprint_signal_gate() {
        let fp = capture_fingerprint(&snapshot_with(-70.0, -80.0, -80.0, -80.0, 2.0));
        assert!(!fp.has_signal);

        let fp = capture_fingerprint(&snapshot_with(-30.0, -20.0, -22.0, -25.0, 4.0));
        assert!(fp.has_signal);
        assert!(fp.is_broadband);
        assert!(!fp.is_percussive);
    }

    #[test]
    fn test_fingerprint_percussive_and_narrowband() {
        let fp = capture_fingerprint(&snapshot_with(-20.0, -5.0, -40.0, -50.0, 15.0));
        assert!(fp.is_percussive);
        assert!(fp.is_narrowband);
        assert!(!fp.is_broadband);
    }
}
