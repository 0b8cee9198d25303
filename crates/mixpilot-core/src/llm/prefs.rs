//! Learns engineer preferences from approve/reject decisions.
//!
//! Per-role counters accumulate over the session and persist across
//! shows. `build_preferences` condenses them into a compact JSON
//! document the LLM sees as `engineer_preferences`, so suggestions
//! drift toward what this engineer actually accepts.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::action::schema::{ActionKind, MixAction};
use crate::types::round_to;

/// Standing instruction cap; oldest are evicted first
const MAX_INSTRUCTIONS: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RoleStats {
    #[serde(rename = "approved", default)]
    total_approved: u32,
    #[serde(rename = "rejected", default)]
    total_rejected: u32,

    #[serde(rename = "eq_boost_approved", default)]
    eq_boost_approvals: u32,
    #[serde(rename = "eq_cut_approved", default)]
    eq_cut_approvals: u32,
    #[serde(rename = "eq_boost_rejected", default)]
    eq_boost_rejections: u32,
    #[serde(rename = "eq_cut_rejected", default)]
    eq_cut_rejections: u32,

    #[serde(rename = "comp_approved", default)]
    comp_approvals: u32,
    #[serde(rename = "comp_rejected", default)]
    comp_rejections: u32,
    #[serde(rename = "comp_ratio_sum", default)]
    comp_ratio_sum: f32,

    #[serde(rename = "fader_approvals", default)]
    fader_approvals: Vec<f32>,
    #[serde(rename = "fader_rejections", default)]
    fader_rejections: Vec<f32>,
    /// Positive = engineer tends to accept pushes up
    #[serde(rename = "fader_direction", default)]
    fader_adjust_direction: i32,

    #[serde(rename = "hpf_approvals", default)]
    hpf_approvals: Vec<f32>,
}

#[derive(Default)]
struct LearnerState {
    role_stats: BTreeMap<String, RoleStats>,
    standing_instructions: Vec<String>,
    dirty: bool,
}

#[derive(Default)]
pub struct PreferenceLearner {
    state: Mutex<LearnerState>,
}

#[derive(Serialize, Deserialize)]
struct PersistedPreferences {
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(default)]
    role_stats: BTreeMap<String, RoleStats>,
}

impl PreferenceLearner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The engineer agreed with a suggestion.
    pub fn record_approval(&self, action: &MixAction, role: &str) {
        let mut state = self.state.lock().unwrap();
        let stats = state.role_stats.entry(role.to_string()).or_default();
        stats.total_approved += 1;

        match action.kind {
            ActionKind::SetFader => {
                stats.fader_approvals.push(action.value);
                stats.fader_adjust_direction += if action.value > 0.5 { 1 } else { -1 };
            }
            ActionKind::SetEqBand => {
                if action.value2 > 0.0 {
                    stats.eq_boost_approvals += 1;
                } else {
                    stats.eq_cut_approvals += 1;
                }
            }
            ActionKind::SetCompressor => {
                stats.comp_approvals += 1;
                stats.comp_ratio_sum += action.value2;
            }
            ActionKind::SetHighPass => {
                stats.hpf_approvals.push(action.value);
            }
            _ => {}
        }
        state.dirty = true;
    }

    /// The engineer shot a suggestion down.
    pub fn record_rejection(&self, action: &MixAction, role: &str) {
        let mut state = self.state.lock().unwrap();
        let stats = state.role_stats.entry(role.to_string()).or_default();
        stats.total_rejected += 1;

        match action.kind {
            ActionKind::SetFader => stats.fader_rejections.push(action.value),
            ActionKind::SetEqBand => {
                if action.value2 > 0.0 {
                    stats.eq_boost_rejections += 1;
                } else {
                    stats.eq_cut_rejections += 1;
                }
            }
            ActionKind::SetCompressor => stats.comp_rejections += 1,
            _ => {}
        }
        state.dirty = true;
    }

    pub fn record_instruction(&self, instruction: &str) {
        let mut state = self.state.lock().unwrap();
        state.standing_instructions.push(instruction.to_string());
        if state.standing_instructions.len() > MAX_INSTRUCTIONS {
            state.standing_instructions.remove(0);
        }
        state.dirty = true;
    }

    /// Compact preferences document for the LLM context. Empty object
    /// when there is nothing to say yet.
    pub fn build_preferences(&self) -> Value {
        let state = self.state.lock().unwrap();
        build_preferences_doc(&state)
    }

    pub fn total_decisions(&self) -> u32 {
        let state = self.state.lock().unwrap();
        state
            .role_stats
            .values()
            .map(|s| s.total_approved + s.total_rejected)
            .sum()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().unwrap().dirty
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        let persisted = PersistedPreferences {
            instructions: state.standing_instructions.clone(),
            role_stats: state.role_stats.clone(),
        };
        let body = serde_json::to_string_pretty(&persisted)
            .context("Failed to serialize preferences")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create preferences directory: {:?}", parent))?;
        }
        std::fs::write(path, body)
            .with_context(|| format!("Failed to write preferences file: {:?}", path))?;
        state.dirty = false;
        Ok(())
    }

    pub fn load_from_file(&self, path: &Path) -> anyhow::Result<()> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preferences file: {:?}", path))?;
        let persisted: PersistedPreferences =
            serde_json::from_str(&body).context("Failed to parse preferences file")?;

        let mut state = self.state.lock().unwrap();
        state.standing_instructions = persisted.instructions;
        state.role_stats = persisted.role_stats;
        state.dirty = false;
        Ok(())
    }
}

fn average(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn build_preferences_doc(state: &LearnerState) -> Value {
    if state.role_stats.is_empty() && state.standing_instructions.is_empty() {
        return json!({});
    }

    let mut prefs = serde_json::Map::new();

    // Overall tendencies across every role
    let mut total_approved = 0u32;
    let mut total_rejected = 0u32;
    let mut boost_approved = 0u32;
    let mut cut_approved = 0u32;
    let mut boost_rejected = 0u32;
    let mut cut_rejected = 0u32;
    for stats in state.role_stats.values() {
        total_approved += stats.total_approved;
        total_rejected += stats.total_rejected;
        boost_approved += stats.eq_boost_approvals;
        cut_approved += stats.eq_cut_approvals;
        boost_rejected += stats.eq_boost_rejections;
        cut_rejected += stats.eq_cut_rejections;
    }

    if total_approved + total_rejected > 5 {
        let rate = total_approved as f32 / (total_approved + total_rejected) as f32;
        prefs.insert("overall_approval_rate".into(), json!(round_to(rate, 2)));
        if rate < 0.4 {
            prefs.insert(
                "note".into(),
                json!("Engineer rejects many suggestions - be more conservative"),
            );
        } else if rate > 0.8 {
            prefs.insert(
                "note".into(),
                json!("Engineer trusts AI suggestions - confidence is appropriate"),
            );
        }
    }

    // EQ tendency
    let eq_decisions = boost_approved + cut_approved + boost_rejected + cut_rejected;
    if eq_decisions > 3 {
        if boost_rejected > boost_approved * 2 {
            prefs.insert(
                "eq_tendency".into(),
                json!("Engineer prefers cuts over boosts - use subtractive EQ"),
            );
        } else if boost_approved > cut_approved {
            prefs.insert("eq_tendency".into(), json!("Engineer is comfortable with EQ boosts"));
        }
    }

    // Per-role preferences, only with enough data
    let mut role_prefs = serde_json::Map::new();
    for (role, stats) in &state.role_stats {
        let decisions = stats.total_approved + stats.total_rejected;
        if decisions < 3 {
            continue;
        }

        let mut rp = serde_json::Map::new();
        let rate = stats.total_approved as f32 / decisions as f32;
        rp.insert("approval_rate".into(), json!(round_to(rate, 2)));

        if !stats.fader_approvals.is_empty() {
            rp.insert(
                "preferred_fader_range".into(),
                json!(round_to(average(&stats.fader_approvals), 2)),
            );
        }

        if stats.comp_approvals + stats.comp_rejections > 2 {
            if stats.comp_rejections > stats.comp_approvals {
                rp.insert("dynamics".into(), json!("engineer prefers less compression on this"));
            } else if stats.comp_approvals > 0 {
                let avg_ratio = stats.comp_ratio_sum / stats.comp_approvals as f32;
                rp.insert("preferred_comp_ratio".into(), json!(round_to(avg_ratio, 1)));
            }
        }

        if !stats.hpf_approvals.is_empty() {
            rp.insert("preferred_hpf_hz".into(), json!(average(&stats.hpf_approvals) as i32));
        }

        if rate < 0.3 {
            rp.insert(
                "warning".into(),
                json!("engineer frequently rejects changes to this - leave it alone unless asked"),
            );
        }

        role_prefs.insert(role.clone(), Value::Object(rp));
    }
    if !role_prefs.is_empty() {
        prefs.insert("role_preferences".into(), Value::Object(role_prefs));
    }

    Value::Object(prefs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fader(value: f32) -> MixAction {
        MixAction { kind: ActionKind::SetFader, channel: 1, value, ..MixAction::default() }
    }

    fn eq(gain: f32) -> MixAction {
        MixAction { kind: ActionKind::SetEqBand, channel: 1, value2: gain, ..MixAction::default() }
    }

    fn comp(ratio: f32) -> MixAction {
        MixAction {
            kind: ActionKind::SetCompressor,
            channel: 1,
            value: -20.0,
            value2: ratio,
            ..MixAction::default()
        }
    }

    #[test]
    fn test_counts_and_total_decisions() {
        let learner = PreferenceLearner::new();
        learner.record_approval(&fader(0.7), "Kick");
        learner.record_approval(&fader(0.6), "Kick");
        learner.record_rejection(&fader(0.9), "Kick");
        learner.record_approval(&eq(2.0), "LeadVocal");
        assert_eq!(learner.total_decisions(), 4);
        assert!(learner.is_dirty());
    }

    #[test]
    fn test_role_preferences_require_three_decisions() {
        let learner = PreferenceLearner::new();
        learner.record_approval(&fader(0.7), "Kick");
        learner.record_approval(&fader(0.6), "Kick");

        let prefs = learner.build_preferences();
        assert!(prefs.get("role_preferences").is_none());

        learner.record_rejection(&fader(0.9), "Kick");
        let prefs = learner.build_preferences();
        let kick = &prefs["role_preferences"]["Kick"];
        assert!((kick["approval_rate"].as_f64().unwrap() - 0.67).abs() < 0.01);
        assert!((kick["preferred_fader_range"].as_f64().unwrap() - 0.65).abs() < 0.01);
    }

    #[test]
    fn test_low_approval_rate_emits_warning_and_note() {
        let learner = PreferenceLearner::new();
        for _ in 0..2 {
            learner.record_approval(&fader(0.5), "Drums");
        }
        for _ in 0..8 {
            learner.record_rejection(&fader(0.9), "Drums");
        }

        let prefs = learner.build_preferences();
        assert!((prefs["overall_approval_rate"].as_f64().unwrap() - 0.2).abs() < 0.01);
        assert!(prefs["note"].as_str().unwrap().contains("conservative"));
        assert!(prefs["role_preferences"]["Drums"]["warning"]
            .as_str()
            .unwrap()
            .contains("leave it alone"));
    }

    #[test]
    fn test_eq_tendency_prefers_cuts() {
        let learner = PreferenceLearner::new();
        learner.record_approval(&eq(2.0), "Vox");
        for _ in 0..5 {
            learner.record_rejection(&eq(3.0), "Vox");
        }
        let prefs = learner.build_preferences();
        assert!(prefs["eq_tendency"].as_str().unwrap().contains("subtractive"));
    }

    #[test]
    fn test_comp_ratio_preference() {
        let learner = PreferenceLearner::new();
        learner.record_approval(&comp(4.0), "BassGuitar");
        learner.record_approval(&comp(6.0), "BassGuitar");
        learner.record_approval(&comp(5.0), "BassGuitar");
        let prefs = learner.build_preferences();
        let bass = &prefs["role_preferences"]["BassGuitar"];
        assert!((bass["preferred_comp_ratio"].as_f64().unwrap() - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_learner_builds_empty_doc() {
        let learner = PreferenceLearner::new();
        assert_eq!(learner.build_preferences(), json!({}));
    }

    #[test]
    fn test_instruction_cap() {
        let learner = PreferenceLearner::new();
        for i in 0..25 {
            learner.record_instruction(&format!("instruction {}", i));
        }
        let state = learner.state.lock().unwrap();
        assert_eq!(state.standing_instructions.len(), MAX_INSTRUCTIONS);
        assert_eq!(state.standing_instructions[0], "instruction 5");
    }

    #[test]
    fn test_save_load_roundtrip() {
        let learner = PreferenceLearner::new();
        learner.record_approval(&fader(0.7), "Kick");
        learner.record_approval(&eq(-3.0), "Kick");
        learner.record_rejection(&comp(8.0), "LeadVocal");
        learner.record_instruction("keep the vocal on top");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        learner.save_to_file(&path).unwrap();
        assert!(!learner.is_dirty());

        let restored = PreferenceLearner::new();
        restored.load_from_file(&path).unwrap();
        assert_eq!(restored.total_decisions(), learner.total_decisions());
        assert_eq!(restored.build_preferences(), learner.build_preferences());

        let state = restored.state.lock().unwrap();
        assert_eq!(state.standing_instructions, vec!["keep the vocal on top"]);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let learner = PreferenceLearner::new();
        assert!(learner.load_from_file(Path::new("/nonexistent/prefs.json")).is_err());
    }
}
