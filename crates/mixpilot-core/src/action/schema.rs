//! Typed action schema. Every LLM decision maps to one of these, and
//! the validator and executor both match exhaustively on the kind.

use serde_json::{json, Value};

/// What the action does. Field meaning per kind:
/// - `SetFader`: v = target 0.0-1.0
/// - `SetEqBand`: v = freq Hz, v2 = gain dB, v3 = Q, band = 1-6
/// - `SetCompressor`: v = threshold dB, v2 = ratio
/// - `SetGate`: v = threshold dB
/// - `SetHighPass`: v = freq Hz
/// - `SetSendLevel`: v = level 0.0-1.0, aux = bus
/// - `SetPan`: v = -1.0..1.0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionKind {
    SetFader,
    SetPan,
    SetEqBand,
    SetCompressor,
    SetGate,
    SetHighPass,
    SetSendLevel,
    MuteChannel,
    UnmuteChannel,
    /// LLM decided no change is needed
    #[default]
    NoAction,
    /// LLM notes something but takes no action
    Observation,
}

impl ActionKind {
    pub fn as_wire(&self) -> &'static str {
        match self {
            ActionKind::SetFader => "set_fader",
            ActionKind::SetPan => "set_pan",
            ActionKind::SetEqBand => "set_eq",
            ActionKind::SetCompressor => "set_comp",
            ActionKind::SetGate => "set_gate",
            ActionKind::SetHighPass => "set_hpf",
            ActionKind::SetSendLevel => "set_send",
            ActionKind::MuteChannel => "mute",
            ActionKind::UnmuteChannel => "unmute",
            ActionKind::NoAction => "no_action",
            ActionKind::Observation => "observation",
        }
    }

    /// Unknown strings become `NoAction`: the parser must tolerate
    /// anything the model invents.
    pub fn from_wire(s: &str) -> ActionKind {
        match s {
            "set_fader" => ActionKind::SetFader,
            "set_pan" => ActionKind::SetPan,
            "set_eq" => ActionKind::SetEqBand,
            "set_comp" => ActionKind::SetCompressor,
            "set_gate" => ActionKind::SetGate,
            "set_hpf" => ActionKind::SetHighPass,
            "set_send" => ActionKind::SetSendLevel,
            "mute" => ActionKind::MuteChannel,
            "unmute" => ActionKind::UnmuteChannel,
            "observation" => ActionKind::Observation,
            _ => ActionKind::NoAction,
        }
    }
}

/// How quickly an action should be applied; drives auto-approval and
/// pending-queue timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Urgency {
    /// Feedback, clipping - apply NOW
    Immediate,
    /// Audible issue - apply within a tick
    Fast,
    /// Optimization - can wait for approval
    #[default]
    Normal,
    /// Suggestion - apply when convenient
    Low,
}

impl Urgency {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Urgency::Immediate => "immediate",
            Urgency::Fast => "fast",
            Urgency::Normal => "normal",
            Urgency::Low => "low",
        }
    }

    pub fn from_wire(s: &str) -> Urgency {
        match s {
            "immediate" => Urgency::Immediate,
            "fast" => Urgency::Fast,
            "low" => Urgency::Low,
            _ => Urgency::Normal,
        }
    }
}

/// One proposed console adjustment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MixAction {
    pub kind: ActionKind,
    /// 1-based channel
    pub channel: usize,
    /// For sends: target bus (1-based)
    pub aux_index: usize,
    /// EQ band number (1-6)
    pub band_index: usize,
    pub value: f32,
    pub value2: f32,
    pub value3: f32,
    pub urgency: Urgency,
    /// "LeadVocal", "Kick", ... for humans and the preference learner
    pub role_name: String,
    /// Free-text explanation from the proposer
    pub reason: String,
}

impl MixAction {
    /// Human-readable one-liner for logs and the approval UI.
    pub fn describe(&self) -> String {
        match self.kind {
            ActionKind::SetFader => format!(
                "Set ch{} ({}) fader to {:.0}%",
                self.channel,
                self.role_name,
                self.value * 100.0
            ),
            ActionKind::SetPan => {
                format!("Set ch{} pan to {:.0}", self.channel, self.value * 100.0)
            }
            ActionKind::SetEqBand => format!(
                "Set ch{} EQ band {}: {:.0}Hz @ {:.1}dB Q={:.1}",
                self.channel, self.band_index, self.value, self.value2, self.value3
            ),
            ActionKind::SetCompressor => format!(
                "Set ch{} comp threshold={:.0}dB ratio={:.1}:1",
                self.channel, self.value, self.value2
            ),
            ActionKind::SetGate => {
                format!("Set ch{} gate threshold={:.0}dB", self.channel, self.value)
            }
            ActionKind::SetHighPass => {
                format!("Set ch{} HPF to {:.0}Hz", self.channel, self.value)
            }
            ActionKind::SetSendLevel => format!(
                "Set ch{} send to bus {} level={:.0}%",
                self.channel,
                self.aux_index,
                self.value * 100.0
            ),
            ActionKind::MuteChannel => format!("Mute ch{} ({})", self.channel, self.role_name),
            ActionKind::UnmuteChannel => {
                format!("Unmute ch{} ({})", self.channel, self.role_name)
            }
            ActionKind::NoAction => format!("No action needed: {}", self.reason),
            ActionKind::Observation => format!("Note: {}", self.reason),
        }
    }

    /// Serialize for logging and session memory.
    pub fn to_json(&self) -> Value {
        json!({
            "action": self.kind.as_wire(),
            "channel": self.channel,
            "aux": self.aux_index,
            "band": self.band_index,
            "value": self.value,
            "value2": self.value2,
            "value3": self.value3,
            "urgency": self.urgency.as_wire(),
            "role": self.role_name,
            "reason": self.reason,
            "description": self.describe(),
        })
    }

    /// Parse one LLM-returned action. Tolerates malformed or partially
    /// populated entries: missing numerics default to 0 except value3
    /// (defaults to 1), unknown strings fall back to safe variants.
    pub fn from_json(j: &Value) -> MixAction {
        let kind = ActionKind::from_wire(j.get("action").and_then(Value::as_str).unwrap_or(""));
        MixAction {
            kind,
            channel: j.get("channel").and_then(Value::as_u64).unwrap_or(0) as usize,
            aux_index: j.get("aux").and_then(Value::as_u64).unwrap_or(0) as usize,
            band_index: j.get("band").and_then(Value::as_u64).unwrap_or(1) as usize,
            value: json_f32(j, "value", 0.0),
            value2: json_f32(j, "value2", 0.0),
            value3: json_f32(j, "value3", 1.0),
            urgency: Urgency::from_wire(j.get("urgency").and_then(Value::as_str).unwrap_or("")),
            role_name: j.get("role").and_then(Value::as_str).unwrap_or("").to_string(),
            reason: j.get("reason").and_then(Value::as_str).unwrap_or("").to_string(),
        }
    }
}

fn json_f32(j: &Value, key: &str, default: f32) -> f32 {
    j.get(key).and_then(Value::as_f64).map(|v| v as f32).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip_preserves_fields() {
        let action = MixAction {
            kind: ActionKind::SetEqBand,
            channel: 3,
            aux_index: 0,
            band_index: 2,
            value: 1000.0,
            value2: -4.5,
            value3: 2.0,
            urgency: Urgency::Fast,
            role_name: "LeadVocal".into(),
            reason: "tame harshness".into(),
        };
        let parsed = MixAction::from_json(&action.to_json());
        assert_eq!(parsed, action);
    }

    #[test]
    fn test_unknown_action_becomes_no_action() {
        let parsed = MixAction::from_json(&serde_json::json!({
            "action": "deploy_lasers", "channel": 2
        }));
        assert_eq!(parsed.kind, ActionKind::NoAction);
        assert_eq!(parsed.channel, 2);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let parsed = MixAction::from_json(&serde_json::json!({ "action": "set_eq" }));
        assert_eq!(parsed.kind, ActionKind::SetEqBand);
        assert_eq!(parsed.channel, 0);
        assert_eq!(parsed.value, 0.0);
        assert_eq!(parsed.value2, 0.0);
        assert_eq!(parsed.value3, 1.0);
        assert_eq!(parsed.band_index, 1);
        assert_eq!(parsed.urgency, Urgency::Normal);
    }

    #[test]
    fn test_unknown_urgency_is_normal() {
        let parsed = MixAction::from_json(&serde_json::json!({
            "action": "set_fader", "channel": 1, "value": 0.5, "urgency": "panic"
        }));
        assert_eq!(parsed.urgency, Urgency::Normal);
    }

    #[test]
    fn test_malformed_entry_is_tolerated() {
        let parsed = MixAction::from_json(&serde_json::json!("not an object"));
        assert_eq!(parsed.kind, ActionKind::NoAction);
        let parsed = MixAction::from_json(&serde_json::json!({ "channel": "five" }));
        assert_eq!(parsed.channel, 0);
    }

    #[test]
    fn test_describe_mentions_channel() {
        let action = MixAction {
            kind: ActionKind::SetFader,
            channel: 5,
            value: 0.72,
            role_name: "Kick".into(),
            ..MixAction::default()
        };
        let d = action.describe();
        assert!(d.contains("ch5"));
        assert!(d.contains("72%"));
    }
}
