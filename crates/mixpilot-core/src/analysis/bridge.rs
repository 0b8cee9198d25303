//! Builds mix-state JSON for the LLM.
//!
//! The bridge between raw meter/spectral data and structured context.
//! The LLM never sees raw spectral data: the analyser draws the
//! conclusions locally and only those (plus console state the model
//! can act on) get serialised.

use serde_json::{json, Value};

use crate::console::state::ConsoleState;
use crate::discovery::channel_map::ChannelMap;
use crate::types::{round_to, SIGNAL_GATE_DB};

use super::analyser::MixIssue;

pub struct MeterBridge<'a> {
    state: &'a ConsoleState,
    channel_map: &'a ChannelMap,
}

impl<'a> MeterBridge<'a> {
    pub fn new(state: &'a ConsoleState, channel_map: &'a ChannelMap) -> Self {
        Self { state, channel_map }
    }

    /// Full mix state for the decision call. Channels that are silent
    /// AND unnamed are omitted; inactive processing blocks are omitted.
    pub fn build_mix_state(&self, issues: &[MixIssue]) -> Value {
        let mut channels = Vec::new();
        let snapshots = self.state.all_channels();

        for profile in self.channel_map.all() {
            if !profile.fingerprint.has_signal && profile.console_name.is_empty() {
                continue;
            }
            let Some(snap) = snapshots.get(profile.index.wrapping_sub(1)) else {
                continue;
            };

            let mut ch = json!({
                "index": profile.index,
                "name": profile.console_name,
                "role": profile.role.as_str(),
                "group": profile.group,
                "fader": round_to(snap.fader, 2),
                "muted": snap.muted,
                "pan": round_to(snap.pan, 2),
                "rms_db": round_to(snap.rms_db, 1),
                "peak_db": round_to(snap.peak_db, 1),
                "has_signal": snap.rms_db > SIGNAL_GATE_DB,
            });

            if let Some(pair) = profile.stereo_pair {
                ch["stereo_pair"] = json!(pair);
            }

            if snap.eq_on {
                let eq: Vec<Value> = snap
                    .eq
                    .iter()
                    .enumerate()
                    .filter(|(_, band)| band.gain.abs() > 0.1)
                    .map(|(i, band)| {
                        json!({
                            "band": i + 1,
                            "freq": band.freq,
                            "gain": round_to(band.gain, 1),
                            "q": round_to(band.q, 2),
                        })
                    })
                    .collect();
                if !eq.is_empty() {
                    ch["eq"] = Value::Array(eq);
                }
            }

            if snap.hpf_on && snap.hpf_freq > 20.0 {
                ch["hpf_hz"] = json!(round_to(snap.hpf_freq, 0));
            }

            if snap.comp.on {
                ch["comp"] = json!({
                    "threshold": round_to(snap.comp.threshold, 1),
                    "ratio": round_to(snap.comp.ratio, 1),
                    "attack": round_to(snap.comp.attack, 1),
                    "release": round_to(snap.comp.release, 0),
                });
            }

            if snap.gate.on {
                ch["gate"] = json!({
                    "threshold": round_to(snap.gate.threshold, 1),
                    "range": round_to(snap.gate.range, 1),
                });
            }

            channels.push(ch);
        }

        let mut state = json!({ "channels": channels });

        if !issues.is_empty() {
            let issue_list: Vec<Value> = issues
                .iter()
                .map(|issue| {
                    let mut ij = json!({
                        "type": issue.kind.as_wire(),
                        "channel": issue.channel,
                        "severity": round_to(issue.severity, 2),
                        "description": issue.description,
                    });
                    if let Some(ch2) = issue.channel2 {
                        ij["channel2"] = json!(ch2);
                    }
                    if issue.freq_hz > 0.0 {
                        ij["freq_hz"] = json!(issue.freq_hz as i32);
                    }
                    ij
                })
                .collect();
            state["issues"] = Value::Array(issue_list);
        }

        state
    }

    /// Compact snapshot for session memory: small enough to record
    /// every few seconds without bloating the LLM context.
    pub fn build_compact_state(&self) -> Value {
        let channels: Vec<Value> = self
            .channel_map
            .active()
            .iter()
            .filter_map(|profile| {
                let snap = self.state.channel(profile.index)?;
                Some(json!({
                    "i": profile.index,
                    "r": profile.role.as_str(),
                    "f": round_to(snap.fader, 2),
                    "db": round_to(snap.rms_db, 0),
                    "pk": round_to(snap.peak_db, 0),
                }))
            })
            .collect();

        json!({ "ch": channels })
    }
}
