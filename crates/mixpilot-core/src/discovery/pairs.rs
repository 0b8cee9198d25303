//! Stereo pair detection across adjacent channels.
//!
//! Engineers patch stereo sources on neighbouring channels and name
//! them "Gtr L"/"Gtr R" or "OH 1"/"OH 2". Scoring: shared name root
//! 0.6, same known role 0.2, dominant-frequency similarity up to 0.2;
//! a pair is emitted above 0.5 and a channel joins at most one pair.

use super::profile::{ChannelProfile, Fingerprint};

/// A detected L/R pair (1-based channel indices).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoPair {
    pub left: usize,
    pub right: usize,
    pub confidence: f32,
}

pub struct StereoPairDetector;

const PAIR_THRESHOLD: f32 = 0.5;

impl StereoPairDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, channels: &[ChannelProfile]) -> Vec<StereoPair> {
        let mut pairs = Vec::new();
        let mut taken = vec![false; channels.len()];

        for i in 0..channels.len().saturating_sub(1) {
            if taken[i] || taken[i + 1] {
                continue;
            }
            let a = &channels[i];
            let b = &channels[i + 1];

            // Only physically adjacent channels pair
            if b.index != a.index + 1 {
                continue;
            }

            let mut score = 0.0f32;
            if names_imply_pair(&a.console_name, &b.console_name) {
                score += 0.6;
            }
            if a.role == b.role && a.role != super::profile::Role::Unknown {
                score += 0.2;
            }
            score += spectral_similarity(&a.fingerprint, &b.fingerprint) * 0.2;

            if score > PAIR_THRESHOLD {
                pairs.push(StereoPair { left: a.index, right: b.index, confidence: score });
                taken[i] = true;
                taken[i + 1] = true;
            }
        }
        pairs
    }
}

impl Default for StereoPairDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn names_imply_pair(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let root_a = strip_pair_suffix(&a);
    let root_b = strip_pair_suffix(&b);
    !root_a.is_empty() && root_a == root_b
}

/// Strip trailing separators plus a single L/R/1/2 marker.
fn strip_pair_suffix(s: &str) -> String {
    let is_sep = |c: char| c == ' ' || c == '-' || c == '/' || c == '_';
    let mut s: &str = s.trim_end_matches(is_sep);
    if let Some(last) = s.chars().last() {
        if matches!(last, 'l' | 'r' | '1' | '2') {
            s = &s[..s.len() - last.len_utf8()];
            s = s.trim_end_matches(is_sep);
        }
    }
    s.to_string()
}

fn spectral_similarity(a: &Fingerprint, b: &Fingerprint) -> f32 {
    if !a.has_signal || !b.has_signal {
        return 0.0;
    }
    let max_freq = a.dominant_freq_hz.max(b.dominant_freq_hz);
    if max_freq < 1.0 {
        return 0.0;
    }
    let diff = (a.dominant_freq_hz - b.dominant_freq_hz).abs() / max_freq;
    (1.0 - diff).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::profile::Role;

    fn profile(index: usize, name: &str, role: Role) -> ChannelProfile {
        let mut p = ChannelProfile::new(index);
        p.console_name = name.to_string();
        p.role = role;
        p
    }

    fn with_signal(mut p: ChannelProfile, dominant: f32) -> ChannelProfile {
        p.fingerprint.has_signal = true;
        p.fingerprint.dominant_freq_hz = dominant;
        p
    }

    #[test]
    fn test_named_lr_pair_detected() {
        let channels = vec![
            with_signal(profile(15, "Gtr L", Role::ElectricGuitar), 1200.0),
            with_signal(profile(16, "Gtr R", Role::ElectricGuitar), 1250.0),
        ];
        let pairs = StereoPairDetector::new().detect(&channels);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].left, pairs[0].right), (15, 16));
        assert!(pairs[0].confidence >= 0.8, "confidence {}", pairs[0].confidence);
    }

    #[test]
    fn test_numbered_pair_detected() {
        let channels = vec![
            profile(7, "OH 1", Role::Overhead),
            profile(8, "OH 2", Role::Overhead),
        ];
        let pairs = StereoPairDetector::new().detect(&channels);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_unrelated_neighbours_do_not_pair() {
        let channels = vec![
            profile(1, "Kick", Role::Kick),
            profile(2, "Snare", Role::Snare),
        ];
        assert!(StereoPairDetector::new().detect(&channels).is_empty());
    }

    #[test]
    fn test_non_adjacent_indices_do_not_pair() {
        let channels = vec![
            profile(3, "Keys L", Role::Keys),
            profile(5, "Keys R", Role::Keys),
        ];
        assert!(StereoPairDetector::new().detect(&channels).is_empty());
    }

    #[test]
    fn test_channel_joins_at_most_one_pair() {
        // Three same-named adjacent channels: first pair wins, third stays solo
        let channels = vec![
            profile(1, "Pno L", Role::Piano),
            profile(2, "Pno R", Role::Piano),
            profile(3, "Pno 2", Role::Piano),
        ];
        let pairs = StereoPairDetector::new().detect(&channels);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].left, pairs[0].right), (1, 2));
    }

    #[test]
    fn test_strip_pair_suffix() {
        assert_eq!(strip_pair_suffix("gtr l"), "gtr");
        assert_eq!(strip_pair_suffix("gtr-r"), "gtr");
        assert_eq!(strip_pair_suffix("keys_1"), "keys");
        assert_eq!(strip_pair_suffix("oh2"), "oh");
        assert_eq!(strip_pair_suffix("kick"), "kick"); // trailing k is not a marker
    }
}
