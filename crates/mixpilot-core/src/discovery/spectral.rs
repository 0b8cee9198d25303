//! Spectral channel classification.
//!
//! Each role declares expected energy windows for four bands plus a
//! crest-factor window. A band scores 1.0 inside its window and decays
//! linearly to 0 over 12 dB outside it; the crest window carries a
//! fixed weight of 2.0. Used when the console name gives nothing away.

use super::profile::{Fingerprint, Role};

#[derive(Debug, Clone, Copy)]
struct BandExpectation {
    min_db: f32,
    max_db: f32,
    weight: f32,
}

struct SpectralProfile {
    role: Role,
    group: &'static str,
    sub: BandExpectation,
    bass: BandExpectation,
    mid: BandExpectation,
    presence: BandExpectation,
    min_crest: f32,
    max_crest: f32,
}

/// Outcome of spectral classification.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralClassification {
    pub role: Role,
    pub group: String,
    /// 0.0-1.0
    pub match_score: f32,
}

pub struct SpectralClassifier {
    profiles: Vec<SpectralProfile>,
}

/// Below this score the best match is not trusted.
const MIN_MATCH: f32 = 0.4;

impl SpectralClassifier {
    pub fn new() -> Self {
        Self { profiles: build_profiles() }
    }

    pub fn classify(&self, fp: &Fingerprint) -> SpectralClassification {
        if !fp.has_signal {
            return SpectralClassification {
                role: Role::NoSignal,
                group: "inactive".into(),
                match_score: 0.0,
            };
        }

        let mut best_score = 0.0f32;
        let mut best: Option<&SpectralProfile> = None;
        for profile in &self.profiles {
            let score = match_score(fp, profile);
            if score > best_score {
                best_score = score;
                best = Some(profile);
            }
        }

        match best {
            Some(profile) if best_score >= MIN_MATCH => SpectralClassification {
                role: profile.role,
                group: profile.group.into(),
                match_score: best_score,
            },
            _ => SpectralClassification {
                role: Role::Unknown,
                group: "unknown".into(),
                match_score: best_score,
            },
        }
    }
}

impl Default for SpectralClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn band_score(energy: f32, exp: &BandExpectation) -> f32 {
    if energy >= exp.min_db && energy <= exp.max_db {
        1.0
    } else {
        let dist = (energy - exp.min_db).abs().min((energy - exp.max_db).abs());
        (1.0 - dist / 12.0).max(0.0)
    }
}

fn match_score(fp: &Fingerprint, profile: &SpectralProfile) -> f32 {
    let mut weighted = 0.0f32;
    let mut total = 0.0f32;

    for (energy, exp) in [
        (fp.sub_bass_energy, &profile.sub),
        (fp.bass_energy, &profile.bass),
        (fp.mid_energy, &profile.mid),
        (fp.presence_energy, &profile.presence),
    ] {
        if exp.weight == 0.0 {
            continue;
        }
        weighted += band_score(energy, exp) * exp.weight;
        total += exp.weight;
    }

    // Crest factor window, fixed weight
    if fp.crest_factor >= profile.min_crest && fp.crest_factor <= profile.max_crest {
        weighted += 2.0;
    }
    total += 2.0;

    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

fn exp(min_db: f32, max_db: f32, weight: f32) -> BandExpectation {
    BandExpectation { min_db, max_db, weight }
}

fn build_profiles() -> Vec<SpectralProfile> {
    vec![
        // Kick: strong sub/bass, percussive, minimal high end
        SpectralProfile {
            role: Role::Kick,
            group: "drums",
            sub: exp(-10.0, 0.0, 2.0),
            bass: exp(-10.0, 0.0, 2.0),
            mid: exp(-30.0, -10.0, 1.0),
            presence: exp(-40.0, -15.0, 0.5),
            min_crest: 8.0,
            max_crest: 30.0,
        },
        // Snare: strong mid, percussive
        SpectralProfile {
            role: Role::Snare,
            group: "drums",
            sub: exp(-40.0, -20.0, 1.0),
            bass: exp(-20.0, -5.0, 1.0),
            mid: exp(-10.0, 2.0, 2.0),
            presence: exp(-20.0, -5.0, 1.5),
            min_crest: 10.0,
            max_crest: 35.0,
        },
        // Hi-hat: almost all high-frequency energy
        SpectralProfile {
            role: Role::HiHat,
            group: "drums",
            sub: exp(-70.0, -40.0, 1.0),
            bass: exp(-60.0, -30.0, 1.0),
            mid: exp(-30.0, -10.0, 1.0),
            presence: exp(-5.0, 5.0, 2.5),
            min_crest: 15.0,
            max_crest: 40.0,
        },
        // Bass guitar: dominant bass, sustained
        SpectralProfile {
            role: Role::BassGuitar,
            group: "bass",
            sub: exp(-5.0, 5.0, 1.5),
            bass: exp(-5.0, 5.0, 2.0),
            mid: exp(-20.0, -5.0, 1.0),
            presence: exp(-45.0, -20.0, 0.5),
            min_crest: 2.0,
            max_crest: 8.0,
        },
        // Lead vocal: concentrated mid/upper-mid
        SpectralProfile {
            role: Role::LeadVocal,
            group: "vocals",
            sub: exp(-50.0, -25.0, 0.5),
            bass: exp(-25.0, -5.0, 1.0),
            mid: exp(-10.0, 3.0, 2.0),
            presence: exp(-20.0, -5.0, 1.5),
            min_crest: 4.0,
            max_crest: 12.0,
        },
        // Electric guitar: mid-heavy
        SpectralProfile {
            role: Role::ElectricGuitar,
            group: "guitars",
            sub: exp(-60.0, -30.0, 1.0),
            bass: exp(-30.0, -10.0, 1.0),
            mid: exp(-5.0, 5.0, 2.0),
            presence: exp(-20.0, -5.0, 1.0),
            min_crest: 3.0,
            max_crest: 10.0,
        },
        // Acoustic guitar: broad midrange with string attack
        SpectralProfile {
            role: Role::AcousticGuitar,
            group: "guitars",
            sub: exp(-50.0, -30.0, 1.0),
            bass: exp(-20.0, -5.0, 1.5),
            mid: exp(-10.0, 3.0, 2.0),
            presence: exp(-15.0, 0.0, 1.5),
            min_crest: 4.0,
            max_crest: 12.0,
        },
        // Piano: full range
        SpectralProfile {
            role: Role::Piano,
            group: "keys",
            sub: exp(-30.0, -10.0, 1.0),
            bass: exp(-15.0, -5.0, 1.5),
            mid: exp(-10.0, 0.0, 2.0),
            presence: exp(-15.0, -5.0, 1.5),
            min_crest: 5.0,
            max_crest: 15.0,
        },
        // Overheads: broadband with lots of cymbal energy
        SpectralProfile {
            role: Role::Overhead,
            group: "drums",
            sub: exp(-30.0, -10.0, 1.0),
            bass: exp(-25.0, -10.0, 1.0),
            mid: exp(-15.0, -5.0, 1.5),
            presence: exp(-5.0, 5.0, 2.0),
            min_crest: 6.0,
            max_crest: 20.0,
        },
        // Toms: like kick with more mid attack
        SpectralProfile {
            role: Role::Tom,
            group: "drums",
            sub: exp(-15.0, -5.0, 1.5),
            bass: exp(-10.0, 0.0, 2.0),
            mid: exp(-15.0, 0.0, 1.5),
            presence: exp(-30.0, -10.0, 0.5),
            min_crest: 8.0,
            max_crest: 25.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(sub: f32, bass: f32, mid: f32, presence: f32, crest: f32) -> Fingerprint {
        Fingerprint {
            sub_bass_energy: sub,
            bass_energy: bass,
            mid_energy: mid,
            presence_energy: presence,
            crest_factor: crest,
            has_signal: true,
            average_rms: -20.0,
            ..Fingerprint::default()
        }
    }

    #[test]
    fn test_no_signal_maps_to_inactive() {
        let c = SpectralClassifier::new();
        let r = c.classify(&Fingerprint::default());
        assert_eq!(r.role, Role::NoSignal);
        assert_eq!(r.group, "inactive");
        assert_eq!(r.match_score, 0.0);
    }

    #[test]
    fn test_kick_like_signal() {
        let c = SpectralClassifier::new();
        // Strong sub/bass, quiet top end, very percussive
        let r = c.classify(&fingerprint(-5.0, -4.0, -20.0, -30.0, 15.0));
        assert_eq!(r.role, Role::Kick);
        assert!(r.match_score > 0.8, "score {}", r.match_score);
    }

    #[test]
    fn test_hihat_like_signal() {
        let c = SpectralClassifier::new();
        let r = c.classify(&fingerprint(-60.0, -50.0, -20.0, 0.0, 25.0));
        assert_eq!(r.role, Role::HiHat);
    }

    #[test]
    fn test_bass_like_signal() {
        let c = SpectralClassifier::new();
        let r = c.classify(&fingerprint(0.0, 0.0, -10.0, -35.0, 4.0));
        assert_eq!(r.role, Role::BassGuitar);
    }

    #[test]
    fn test_ambiguous_signal_is_unknown() {
        let c = SpectralClassifier::new();
        // Nothing like any profile: all bands at the floor but signal set
        let r = c.classify(&fingerprint(-90.0, -90.0, -90.0, -90.0, 0.0));
        assert_eq!(r.role, Role::Unknown);
        assert!(r.match_score < MIN_MATCH);
    }

    #[test]
    fn test_band_score_decay() {
        let e = exp(-10.0, 0.0, 1.0);
        assert_eq!(band_score(-5.0, &e), 1.0);
        assert_eq!(band_score(-10.0, &e), 1.0);
        assert!((band_score(-16.0, &e) - 0.5).abs() < 1e-5);
        assert_eq!(band_score(-30.0, &e), 0.0);
    }
}
