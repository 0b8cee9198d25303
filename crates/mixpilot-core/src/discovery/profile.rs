//! Semantic channel profiles: roles, confidence and spectral fingerprints.

use std::time::Instant;

use crate::types::DB_FLOOR;

/// Semantic role of a channel. Closed set; the LLM reasons about the
/// mix in terms of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Unknown,
    // Drums
    Kick,
    Snare,
    HiHat,
    Tom,
    Overhead,
    RoomMic,
    // Bass
    BassGuitar,
    BassAmp,
    // Guitars
    ElectricGuitar,
    AcousticGuitar,
    // Keys
    Piano,
    Keys,
    Organ,
    Synth,
    // Vocals
    LeadVocal,
    BackingVocal,
    Choir,
    Presenter,
    Announcer,
    // Brass / strings
    Trumpet,
    Saxophone,
    Violin,
    Cello,
    // Other
    Di,
    Playback,
    Talkback,
    FxReturn,
    // Special
    Muted,
    NoSignal,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unknown => "Unknown",
            Role::Kick => "Kick",
            Role::Snare => "Snare",
            Role::HiHat => "HiHat",
            Role::Tom => "Tom",
            Role::Overhead => "Overhead",
            Role::RoomMic => "RoomMic",
            Role::BassGuitar => "BassGuitar",
            Role::BassAmp => "BassAmp",
            Role::ElectricGuitar => "ElectricGuitar",
            Role::AcousticGuitar => "AcousticGuitar",
            Role::Piano => "Piano",
            Role::Keys => "Keys",
            Role::Organ => "Organ",
            Role::Synth => "Synth",
            Role::LeadVocal => "LeadVocal",
            Role::BackingVocal => "BackingVocal",
            Role::Choir => "Choir",
            Role::Presenter => "Presenter",
            Role::Announcer => "Announcer",
            Role::Trumpet => "Trumpet",
            Role::Saxophone => "Saxophone",
            Role::Violin => "Violin",
            Role::Cello => "Cello",
            Role::Di => "DI",
            Role::Playback => "Playback",
            Role::Talkback => "Talkback",
            Role::FxReturn => "FXReturn",
            Role::Muted => "Muted",
            Role::NoSignal => "NoSignal",
        }
    }

    pub fn from_str(s: &str) -> Role {
        match s {
            "Kick" => Role::Kick,
            "Snare" => Role::Snare,
            "HiHat" => Role::HiHat,
            "Tom" => Role::Tom,
            "Overhead" => Role::Overhead,
            "RoomMic" => Role::RoomMic,
            "BassGuitar" => Role::BassGuitar,
            "BassAmp" => Role::BassAmp,
            "ElectricGuitar" => Role::ElectricGuitar,
            "AcousticGuitar" => Role::AcousticGuitar,
            "Piano" => Role::Piano,
            "Keys" => Role::Keys,
            "Organ" => Role::Organ,
            "Synth" => Role::Synth,
            "LeadVocal" => Role::LeadVocal,
            "BackingVocal" => Role::BackingVocal,
            "Choir" => Role::Choir,
            "Presenter" => Role::Presenter,
            "Announcer" => Role::Announcer,
            "Trumpet" => Role::Trumpet,
            "Saxophone" => Role::Saxophone,
            "Violin" => Role::Violin,
            "Cello" => Role::Cello,
            "DI" => Role::Di,
            "Playback" => Role::Playback,
            "Talkback" => Role::Talkback,
            "FXReturn" => Role::FxReturn,
            "Muted" => Role::Muted,
            "NoSignal" => Role::NoSignal,
            _ => Role::Unknown,
        }
    }
}

/// How sure discovery is about a role. Ordered by quality, so
/// `confidence <= Confidence::Low` means "generic or unclassified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Confidence {
    /// No signal, generic name
    #[default]
    Unknown,
    /// Guessing from spectral only
    Low,
    /// Name or spectral, not both
    Medium,
    /// Name and spectral agree
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
            Confidence::Unknown => "Unknown",
        }
    }
}

/// Spectral fingerprint captured for a channel at discovery time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fingerprint {
    pub dominant_freq_hz: f32,
    pub spectral_centroid: f32,
    /// 20-80 Hz
    pub sub_bass_energy: f32,
    /// 80-250 Hz
    pub bass_energy: f32,
    /// 250-500 Hz
    pub low_mid_energy: f32,
    /// 500-2k Hz
    pub mid_energy: f32,
    /// 2k-6k Hz
    pub upper_mid_energy: f32,
    /// 6k-10k Hz
    pub presence_energy: f32,
    /// 10k-20k Hz
    pub air_energy: f32,
    pub crest_factor: f32,
    pub average_rms: f32,
    pub has_signal: bool,
    /// High crest factor
    pub is_percussive: bool,
    /// Energy across most bands
    pub is_broadband: bool,
    /// Energy concentrated in one region
    pub is_narrowband: bool,
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self {
            dominant_freq_hz: 0.0,
            spectral_centroid: 0.0,
            sub_bass_energy: DB_FLOOR,
            bass_energy: DB_FLOOR,
            low_mid_energy: DB_FLOOR,
            mid_energy: DB_FLOOR,
            upper_mid_energy: DB_FLOOR,
            presence_energy: DB_FLOOR,
            air_energy: DB_FLOOR,
            crest_factor: 0.0,
            average_rms: DB_FLOOR,
            has_signal: false,
            is_percussive: false,
            is_broadband: false,
            is_narrowband: false,
        }
    }
}

/// Semantic overlay on one console channel.
#[derive(Debug, Clone)]
pub struct ChannelProfile {
    /// 1-based physical channel number
    pub index: usize,
    /// Raw name from the console ("Kick", "CH 01", "")
    pub console_name: String,
    /// Cleaned-up name ("kick", "ch01", "")
    pub normalised_name: String,

    pub role: Role,
    pub confidence: Confidence,
    /// "drums", "bass", "guitars", "vocals", ... (inferred from role)
    pub group: String,

    pub fingerprint: Fingerprint,

    // Console state at discovery
    pub fader_norm: f32,
    pub muted: bool,
    pub gain_db: f32,
    pub phantom_power: bool,
    pub phase_invert: bool,
    /// Current HPF corner (0 = off)
    pub high_pass_hz: f32,

    /// Partner channel if this is one side of an L/R pair
    pub stereo_pair: Option<usize>,

    pub discovered_at: Instant,
    pub last_updated: Instant,
    /// LLM's free-text observations from the discovery review
    pub llm_notes: String,
    /// Engineer corrected the inferred role; automation must not undo it
    pub manually_overridden: bool,
}

impl ChannelProfile {
    pub fn new(index: usize) -> Self {
        let now = Instant::now();
        Self {
            index,
            console_name: String::new(),
            normalised_name: String::new(),
            role: Role::Unknown,
            confidence: Confidence::Unknown,
            group: "unknown".to_string(),
            fingerprint: Fingerprint::default(),
            fader_norm: 0.75,
            muted: false,
            gain_db: 0.0,
            phantom_power: false,
            phase_invert: false,
            high_pass_hz: 0.0,
            stereo_pair: None,
            discovered_at: now,
            last_updated: now,
            llm_notes: String::new(),
            manually_overridden: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_string_roundtrip() {
        for role in [
            Role::Kick,
            Role::LeadVocal,
            Role::Di,
            Role::FxReturn,
            Role::NoSignal,
            Role::Unknown,
        ] {
            assert_eq!(Role::from_str(role.as_str()), role);
        }
        assert_eq!(Role::from_str("not a role"), Role::Unknown);
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Unknown < Confidence::Low);
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
        assert!(Confidence::Unknown <= Confidence::Low);
        assert!(!(Confidence::High <= Confidence::Low));
    }
}
