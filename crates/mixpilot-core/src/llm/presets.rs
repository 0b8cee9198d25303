//! Genre-specific mix targets.
//!
//! Each preset defines target RMS levels (relative to the mix bus), EQ
//! character and dynamics guidance per instrument role. Injected into
//! the LLM context as `genre_preset` - a reference to mix toward, not
//! hard rules.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{json, Value};

use crate::discovery::profile::Role;

/// Mix guidance for one instrument role.
#[derive(Debug, Clone)]
pub struct RoleMixTarget {
    pub role: Role,
    /// dB relative to the mix bus (0 = level with the bus)
    pub target_rms_relative: f32,
    /// -1.0 to 1.0, 0 = center
    pub pan_target: f32,
    /// "warm", "bright", "punchy", ...
    pub eq_character: String,
    /// "moderate compression 4:1", "light gate", ...
    pub dynamics_hint: String,
    /// Freeform guidance for this role
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct GenrePreset {
    pub name: String,
    pub description: String,
    pub targets: Vec<RoleMixTarget>,
}

impl GenrePreset {
    pub fn to_json(&self) -> Value {
        let targets: Vec<Value> = self
            .targets
            .iter()
            .map(|t| {
                let mut tj = serde_json::Map::new();
                tj.insert("role".into(), json!(t.role.as_str()));
                tj.insert("target_db_relative".into(), json!(t.target_rms_relative));
                if t.pan_target != 0.0 {
                    tj.insert("pan".into(), json!(t.pan_target));
                }
                if !t.eq_character.is_empty() {
                    tj.insert("eq_character".into(), json!(t.eq_character));
                }
                if !t.dynamics_hint.is_empty() {
                    tj.insert("dynamics".into(), json!(t.dynamics_hint));
                }
                if !t.notes.is_empty() {
                    tj.insert("notes".into(), json!(t.notes));
                }
                Value::Object(tj)
            })
            .collect();

        json!({
            "genre": self.name,
            "description": self.description,
            "targets": targets,
        })
    }

    pub fn target_for_role(&self, role: Role) -> Option<&RoleMixTarget> {
        self.targets.iter().find(|t| t.role == role)
    }
}

/// Built-in presets plus anything loaded from disk.
pub struct GenrePresetLibrary {
    presets: BTreeMap<String, GenrePreset>,
}

impl GenrePresetLibrary {
    pub fn new() -> Self {
        let mut presets = BTreeMap::new();
        for preset in build_defaults() {
            presets.insert(preset.name.clone(), preset);
        }
        Self { presets }
    }

    pub fn get(&self, name: &str) -> Option<&GenrePreset> {
        self.presets.get(name)
    }

    pub fn available(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    /// Load a custom preset from a JSON file.
    pub fn load_from_file(&mut self, path: &Path) -> anyhow::Result<String> {
        let body = std::fs::read_to_string(path)?;
        let j: Value = serde_json::from_str(&body)?;

        let name = j.get("genre").and_then(Value::as_str).unwrap_or("custom").to_string();
        let description =
            j.get("description").and_then(Value::as_str).unwrap_or("").to_string();

        let mut targets = Vec::new();
        if let Some(items) = j.get("targets").and_then(Value::as_array) {
            for tj in items {
                let role = Role::from_str(tj.get("role").and_then(Value::as_str).unwrap_or(""));
                targets.push(RoleMixTarget {
                    role,
                    target_rms_relative: tj
                        .get("target_db_relative")
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0) as f32,
                    pan_target: tj.get("pan").and_then(Value::as_f64).unwrap_or(0.0) as f32,
                    eq_character: json_str(tj.get("eq_character")),
                    dynamics_hint: json_str(tj.get("dynamics")),
                    notes: json_str(tj.get("notes")),
                });
            }
        }

        self.presets.insert(name.clone(), GenrePreset { name: name.clone(), description, targets });
        Ok(name)
    }
}

impl Default for GenrePresetLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn json_str(v: Option<&Value>) -> String {
    v.and_then(Value::as_str).unwrap_or("").to_string()
}

fn t(
    role: Role,
    target_rms_relative: f32,
    pan_target: f32,
    eq_character: &str,
    dynamics_hint: &str,
    notes: &str,
) -> RoleMixTarget {
    RoleMixTarget {
        role,
        target_rms_relative,
        pan_target,
        eq_character: eq_character.to_string(),
        dynamics_hint: dynamics_hint.to_string(),
        notes: notes.to_string(),
    }
}

fn build_defaults() -> Vec<GenrePreset> {
    vec![
        GenrePreset {
            name: "rock".into(),
            description: "Punchy drums, driving guitars, vocals above the band".into(),
            targets: vec![
                t(Role::Kick, -6.0, 0.0, "punchy, tight low-end", "moderate compression 4:1, fast attack", "HPF around 50Hz, cut boxiness at 300-400Hz"),
                t(Role::Snare, -4.0, 0.0, "crack with body", "medium compression 3:1", "boost attack at 2-5kHz, body at 200Hz"),
                t(Role::HiHat, -14.0, 0.3, "crisp not harsh", "", "HPF at 300Hz, tame harshness at 3-4kHz"),
                t(Role::Tom, -8.0, 0.0, "full, round attack", "light compression", "cut mud at 300-500Hz"),
                t(Role::Overhead, -10.0, 0.0, "natural cymbals, room", "", "HPF at 200Hz"),
                t(Role::BassGuitar, -6.0, 0.0, "warm and defined", "moderate compression 4:1", "separate from kick in low-mid, DI+amp blend"),
                t(Role::ElectricGuitar, -8.0, -0.3, "mid-forward, biting", "light compression", "don't compete with vocal 2-4kHz range"),
                t(Role::AcousticGuitar, -10.0, 0.3, "open, strummy", "", "HPF at 100Hz, presence boost"),
                t(Role::LeadVocal, 0.0, 0.0, "clear, upfront, present", "moderate compression 3:1", "this is the star - sits above everything, de-ess if sibilant"),
                t(Role::BackingVocal, -6.0, 0.0, "supportive, blended", "medium compression", "4-6dB below lead vocal"),
                t(Role::Keys, -10.0, 0.2, "pad underneath", "", "stay out of vocal range"),
            ],
        },
        GenrePreset {
            name: "jazz".into(),
            description: "Natural, dynamic, piano/bass/drums trio feel, minimal processing".into(),
            targets: vec![
                t(Role::Kick, -10.0, 0.0, "warm, natural", "very light or none", "let dynamics breathe, no heavy gating"),
                t(Role::Snare, -8.0, 0.0, "warm brush or stick", "very light", "no harsh processing"),
                t(Role::HiHat, -14.0, 0.3, "natural sizzle", "", ""),
                t(Role::Overhead, -6.0, 0.0, "primary drum image", "", "these carry the kit sound in jazz"),
                t(Role::BassGuitar, -4.0, 0.0, "warm, full, walking", "very light", "upright bass needs body, HPF only at 30Hz"),
                t(Role::Piano, 0.0, 0.0, "full, dynamic, rich", "none or very light", "often the lead - let it breathe"),
                t(Role::Keys, -4.0, 0.0, "natural, dynamic", "", ""),
                t(Role::ElectricGuitar, -6.0, 0.3, "clean, warm", "", "jazz guitar sits behind piano"),
                t(Role::LeadVocal, -2.0, 0.0, "intimate, warm", "very light 2:1", "jazz vocals are conversational, not arena"),
                t(Role::Saxophone, -2.0, 0.0, "rich, honky character", "", "don't over-EQ, natural is better"),
                t(Role::Trumpet, -4.0, 0.0, "bright but not harsh", "", "watch for harshness in upper register"),
            ],
        },
        GenrePreset {
            name: "worship".into(),
            description: "Big pads, clear vocals, emotional dynamics, atmospheric".into(),
            targets: vec![
                t(Role::Kick, -8.0, 0.0, "modern click + sub", "moderate 4:1", "tight, controlled low-end, sub emphasis"),
                t(Role::Snare, -6.0, 0.0, "fat, reverbed", "moderate 3:1", "generous reverb, big snare sound"),
                t(Role::BassGuitar, -6.0, 0.0, "sub-heavy, smooth", "moderate compression", "stay below 200Hz primarily"),
                t(Role::ElectricGuitar, -10.0, 0.4, "ambient, washed", "", "lots of delay/reverb, textural not rhythmic"),
                t(Role::AcousticGuitar, -8.0, 0.3, "bright, rhythmic", "", "drives the rhythm in quieter sections"),
                t(Role::Keys, -6.0, 0.0, "big pads, atmospheric", "", "synth pads are foundational - warm and wide"),
                t(Role::Piano, -6.0, 0.0, "emotional, dynamic", "light", "let it lead in quiet moments"),
                t(Role::LeadVocal, 0.0, 0.0, "clear, emotional, present", "moderate 3:1", "the most important element - always intelligible"),
                t(Role::BackingVocal, -6.0, 0.0, "blended, lush", "moderate", "tight harmonies, cohesive with lead"),
                t(Role::Choir, -8.0, 0.0, "full, blended wash", "", "congregation feel, not individual voices"),
            ],
        },
        GenrePreset {
            name: "edm".into(),
            description: "Loud, punchy, bass-heavy, everything compressed and controlled".into(),
            targets: vec![
                t(Role::Kick, -2.0, 0.0, "huge sub + transient click", "heavy compression 8:1", "sidechain everything to this"),
                t(Role::Snare, -4.0, 0.0, "layered, big clap/snare", "heavy compression", "reverb tail adds size"),
                t(Role::HiHat, -12.0, 0.3, "crisp, cutting", "", "precise, mechanical feel"),
                t(Role::BassGuitar, -2.0, 0.0, "massive sub, distorted mid", "heavy compression", "sidechain to kick, dominate the low-end"),
                t(Role::Synth, -6.0, 0.0, "leads bright, pads wide", "moderate", "automate filter sweeps"),
                t(Role::Keys, -8.0, 0.4, "pads: warm stereo, stabs: mono punch", "", ""),
                t(Role::LeadVocal, -2.0, 0.0, "processed, effected, upfront", "heavy compression 6:1", "autotune/vocoder acceptable, always audible"),
                t(Role::Playback, -4.0, 0.0, "full, matched to live elements", "", "blend seamlessly with live instruments"),
            ],
        },
        GenrePreset {
            name: "acoustic".into(),
            description: "Intimate, natural, vocal-forward with minimal instrumentation".into(),
            targets: vec![
                t(Role::AcousticGuitar, -4.0, 0.0, "natural, warm, body", "light compression 2:1", "primary instrument - full range"),
                t(Role::LeadVocal, 0.0, 0.0, "intimate, clear, present", "light compression 2:1", "the whole show - above everything else"),
                t(Role::Piano, -4.0, 0.0, "natural, unprocessed", "none or very light", "pair with voice naturally"),
                t(Role::BassGuitar, -8.0, 0.0, "warm support", "light", "subtle foundation"),
                t(Role::Violin, -6.0, 0.2, "singing, expressive", "", "complement the vocal"),
                t(Role::BackingVocal, -8.0, 0.0, "gentle harmony", "light", "well behind the lead"),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_presets_available() {
        let lib = GenrePresetLibrary::new();
        let names = lib.available();
        for name in ["rock", "jazz", "worship", "edm", "acoustic"] {
            assert!(names.contains(&name.to_string()), "missing {}", name);
        }
        assert!(lib.get("polka").is_none());
    }

    #[test]
    fn test_rock_vocal_on_top() {
        let lib = GenrePresetLibrary::new();
        let rock = lib.get("rock").unwrap();
        let vocal = rock.target_for_role(Role::LeadVocal).unwrap();
        let kick = rock.target_for_role(Role::Kick).unwrap();
        assert!(vocal.target_rms_relative > kick.target_rms_relative);
    }

    #[test]
    fn test_to_json_skips_empty_fields() {
        let lib = GenrePresetLibrary::new();
        let jazz = lib.get("jazz").unwrap().to_json();
        assert_eq!(jazz["genre"], "jazz");
        let targets = jazz["targets"].as_array().unwrap();
        // HiHat target has no dynamics hint; the key must be absent
        let hihat = targets.iter().find(|t| t["role"] == "HiHat").unwrap();
        assert!(hihat.get("dynamics").is_none());
        assert!(hihat.get("pan").is_some());
    }

    #[test]
    fn test_load_custom_preset_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surf.json");
        std::fs::write(
            &path,
            r#"{
                "genre": "surf",
                "description": "Wet reverb everything",
                "targets": [
                    { "role": "ElectricGuitar", "target_db_relative": -2.0,
                      "eq_character": "drippy", "notes": "spring reverb forward" }
                ]
            }"#,
        )
        .unwrap();

        let mut lib = GenrePresetLibrary::new();
        let name = lib.load_from_file(&path).unwrap();
        assert_eq!(name, "surf");
        let preset = lib.get("surf").unwrap();
        assert_eq!(preset.targets.len(), 1);
        assert_eq!(preset.targets[0].role, Role::ElectricGuitar);
        assert_eq!(preset.targets[0].eq_character, "drippy");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let mut lib = GenrePresetLibrary::new();
        assert!(lib.load_from_file(Path::new("/nonexistent/preset.json")).is_err());
    }
}
