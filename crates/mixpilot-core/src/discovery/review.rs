//! LLM review of the locally-built channel map.
//!
//! The model sees each channel's name, inferred role and a spectral
//! summary, and may correct misclassifications, add missed stereo
//! pairs, and flag suspicious settings (48V on a channel named
//! "Snare"). Manually-overridden profiles are never touched.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::llm::engine::{DecisionEngine, LlmError};

use super::profile::{ChannelProfile, Confidence, Role};

pub struct DiscoveryReview {
    llm: Arc<DecisionEngine>,
}

impl DiscoveryReview {
    pub fn new(llm: Arc<DecisionEngine>) -> Self {
        Self { llm }
    }

    /// Run the review pass. On transport failure the error propagates;
    /// the caller keeps the local classification.
    pub fn review(&self, profiles: Vec<ChannelProfile>) -> Result<Vec<ChannelProfile>, LlmError> {
        let prompt = build_prompt(&profiles);
        let response = self.llm.call_raw(SYSTEM_PROMPT, &prompt.to_string())?;
        Ok(apply_response(&response, profiles))
    }
}

const SYSTEM_PROMPT: &str = r#"You are an experienced live sound engineer reviewing a channel map
that was automatically detected from a mixing console.

Your job is to:
1. Identify any channels that are probably misclassified
2. Spot likely stereo pairs that weren't detected
3. Identify the overall band/show type from the channel layout
4. Flag any channels with suspicious settings (e.g. phantom on a dynamic mic)

Respond ONLY with valid JSON:
{
  "show_type": "rock_band|jazz_quartet|musical_theatre|conference|dj_set|...",
  "show_confidence": 0.85,
  "observations": "brief overall assessment",
  "corrections": [
    {
      "channel": 5,
      "current_role": "Unknown",
      "suggested_role": "ElectricGuitar",
      "reason": "named 'GTR1', spectral profile matches guitar",
      "confidence": 0.9
    }
  ],
  "stereo_pairs": [
    { "left": 15, "right": 16, "reason": "named GTR L/R, same role" }
  ],
  "concerns": [
    {
      "channel": 3,
      "issue": "phantom_48v_on_dynamic",
      "detail": "channel named 'Snare' has 48V phantom - likely a mistake"
    }
  ]
}"#;

fn build_prompt(profiles: &[ChannelProfile]) -> Value {
    let channels: Vec<Value> = profiles
        .iter()
        .filter(|p| p.fingerprint.has_signal || !p.console_name.is_empty())
        .map(|p| {
            json!({
                "channel": p.index,
                "name": p.console_name,
                "inferred_role": p.role.as_str(),
                "confidence": p.confidence.as_str(),
                "has_signal": p.fingerprint.has_signal,
                "fader_norm": p.fader_norm,
                "muted": p.muted,
                "phantom_48v": p.phantom_power,
                "phase_invert": p.phase_invert,
                "hpf_hz": p.high_pass_hz,
                "spectral": {
                    "dominant_hz": p.fingerprint.dominant_freq_hz,
                    "bass_energy": p.fingerprint.bass_energy,
                    "mid_energy": p.fingerprint.mid_energy,
                    "high_energy": p.fingerprint.presence_energy,
                    "crest_factor": p.fingerprint.crest_factor,
                    "is_percussive": p.fingerprint.is_percussive,
                },
            })
        })
        .collect();
    json!({ "channels": channels })
}

fn apply_response(response: &str, mut profiles: Vec<ChannelProfile>) -> Vec<ChannelProfile> {
    let j: Value = match serde_json::from_str(response) {
        Ok(j) => j,
        Err(e) => {
            log::error!("Failed to parse LLM discovery response: {}", e);
            return profiles;
        }
    };

    log::info!(
        "LLM identified show type: {} (confidence: {:.2})",
        j.get("show_type").and_then(Value::as_str).unwrap_or("unknown"),
        j.get("show_confidence").and_then(Value::as_f64).unwrap_or(0.0)
    );
    if let Some(obs) = j.get("observations").and_then(Value::as_str) {
        log::info!("LLM observations: {}", obs);
    }

    if let Some(corrections) = j.get("corrections").and_then(Value::as_array) {
        for correction in corrections {
            let Some(ch) = correction.get("channel").and_then(Value::as_u64) else {
                continue;
            };
            let ch = ch as usize;
            if ch < 1 || ch > profiles.len() {
                continue;
            }
            let profile = &mut profiles[ch - 1];
            if profile.manually_overridden {
                continue;
            }

            let suggested =
                correction.get("suggested_role").and_then(Value::as_str).unwrap_or("");
            profile.role = Role::from_str(suggested);
            profile.confidence = Confidence::Medium;
            profile.llm_notes =
                correction.get("reason").and_then(Value::as_str).unwrap_or("").to_string();
            log::info!("LLM corrected ch{} ({}) -> {}", ch, profile.console_name, suggested);
        }
    }

    if let Some(pairs) = j.get("stereo_pairs").and_then(Value::as_array) {
        for pair in pairs {
            let (Some(l), Some(r)) = (
                pair.get("left").and_then(Value::as_u64).map(|v| v as usize),
                pair.get("right").and_then(Value::as_u64).map(|v| v as usize),
            ) else {
                continue;
            };
            if l < 1 || l > profiles.len() || r < 1 || r > profiles.len() {
                continue;
            }
            profiles[l - 1].stereo_pair = Some(r);
            profiles[r - 1].stereo_pair = Some(l);
            log::info!("LLM detected stereo pair: ch{} / ch{}", l, r);
        }
    }

    if let Some(concerns) = j.get("concerns").and_then(Value::as_array) {
        for concern in concerns {
            log::warn!(
                "Discovery concern on ch{}: {}",
                concern.get("channel").and_then(Value::as_u64).unwrap_or(0),
                concern.get("detail").and_then(Value::as_str).unwrap_or("unknown issue")
            );
        }
    }

    profiles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles(n: usize) -> Vec<ChannelProfile> {
        (1..=n).map(ChannelProfile::new).collect()
    }

    #[test]
    fn test_corrections_applied() {
        let response = r#"{
            "show_type": "rock_band",
            "show_confidence": 0.9,
            "corrections": [
                { "channel": 2, "suggested_role": "ElectricGuitar", "reason": "named GTR1" }
            ]
        }"#;
        let result = apply_response(response, profiles(4));
        assert_eq!(result[1].role, Role::ElectricGuitar);
        assert_eq!(result[1].confidence, Confidence::Medium);
        assert_eq!(result[1].llm_notes, "named GTR1");
    }

    #[test]
    fn test_manual_override_is_respected() {
        let mut ps = profiles(4);
        ps[1].role = Role::Snare;
        ps[1].manually_overridden = true;

        let response = r#"{ "corrections": [
            { "channel": 2, "suggested_role": "Kick" }
        ]}"#;
        let result = apply_response(response, ps);
        assert_eq!(result[1].role, Role::Snare);
    }

    #[test]
    fn test_stereo_pairs_applied_both_ways() {
        let response = r#"{ "stereo_pairs": [ { "left": 1, "right": 2 } ] }"#;
        let result = apply_response(response, profiles(4));
        assert_eq!(result[0].stereo_pair, Some(2));
        assert_eq!(result[1].stereo_pair, Some(1));
    }

    #[test]
    fn test_out_of_range_entries_ignored() {
        let response = r#"{
            "corrections": [ { "channel": 99, "suggested_role": "Kick" } ],
            "stereo_pairs": [ { "left": 0, "right": 2 }, { "left": 3, "right": 12 } ]
        }"#;
        let result = apply_response(response, profiles(4));
        assert!(result.iter().all(|p| p.role == Role::Unknown));
        assert!(result.iter().all(|p| p.stereo_pair.is_none()));
    }

    #[test]
    fn test_garbage_response_keeps_profiles() {
        let mut ps = profiles(2);
        ps[0].role = Role::Kick;
        let result = apply_response("the console looks great!", ps);
        assert_eq!(result[0].role, Role::Kick);
    }

    #[test]
    fn test_prompt_skips_dead_unnamed_channels() {
        let mut ps = profiles(3);
        ps[0].console_name = "Kick".into();
        ps[2].fingerprint.has_signal = true;
        let prompt = build_prompt(&ps);
        let channels = prompt["channels"].as_array().unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0]["channel"], 1);
        assert_eq!(channels[1]["channel"], 3);
    }
}
