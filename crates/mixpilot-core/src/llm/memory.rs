//! Rolling session memory.
//!
//! A bounded FIFO of everything that happened this show: actions taken
//! and rejected, observations, engineer overrides and instructions,
//! periodic mix snapshots. The most recent slice is serialised into
//! the LLM prompt as `recent_history`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Value};

use crate::action::schema::MixAction;

/// Default bound on retained entries
pub const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    /// We changed something
    ActionTaken,
    /// The approval queue rejected it
    ActionRejected,
    /// LLM noted something
    Observation,
    /// Engineer manually changed something
    EngOverride,
    /// Engineer typed a chat instruction
    EngInstruction,
    /// Periodic mix state dump
    MixSnapshot,
}

impl MemoryKind {
    fn as_wire(&self) -> &'static str {
        match self {
            MemoryKind::ActionTaken => "action_taken",
            MemoryKind::ActionRejected => "action_rejected",
            MemoryKind::Observation => "observation",
            MemoryKind::EngOverride => "engineer_override",
            MemoryKind::EngInstruction => "engineer_instruction",
            MemoryKind::MixSnapshot => "snapshot",
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    timestamp: Instant,
    kind: MemoryKind,
    action: Option<MixAction>,
    context: Option<Value>,
    note: String,
}

pub struct SessionMemory {
    entries: Mutex<VecDeque<MemoryEntry>>,
    capacity: usize,
}

impl SessionMemory {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Mutex::new(VecDeque::new()), capacity }
    }

    pub fn record_action(&self, action: &MixAction, context: Value) {
        self.push(MemoryEntry {
            timestamp: Instant::now(),
            kind: MemoryKind::ActionTaken,
            note: action.describe(),
            action: Some(action.clone()),
            context: Some(context),
        });
    }

    pub fn record_rejection(&self, action: &MixAction, reason: &str) {
        self.push(MemoryEntry {
            timestamp: Instant::now(),
            kind: MemoryKind::ActionRejected,
            note: format!("Rejected: {}", reason),
            action: Some(action.clone()),
            context: None,
        });
    }

    pub fn record_observation(&self, note: &str) {
        self.push(MemoryEntry {
            timestamp: Instant::now(),
            kind: MemoryKind::Observation,
            note: note.to_string(),
            action: None,
            context: None,
        });
    }

    pub fn record_override(&self, channel: usize, what: &str) {
        self.push(MemoryEntry {
            timestamp: Instant::now(),
            kind: MemoryKind::EngOverride,
            note: format!("Engineer override ch{}: {}", channel, what),
            action: None,
            context: Some(json!({ "channel": channel })),
        });
    }

    pub fn record_instruction(&self, instruction: &str) {
        self.push(MemoryEntry {
            timestamp: Instant::now(),
            kind: MemoryKind::EngInstruction,
            note: instruction.to_string(),
            action: None,
            context: None,
        });
    }

    pub fn record_snapshot(&self, mix_state: Value) {
        self.push(MemoryEntry {
            timestamp: Instant::now(),
            kind: MemoryKind::MixSnapshot,
            note: "Mix snapshot".into(),
            action: None,
            context: Some(mix_state),
        });
    }

    /// Standing instructions, oldest first, capped at `max`.
    pub fn active_instructions(&self, max: usize) -> Vec<String> {
        let entries = self.entries.lock().unwrap();
        let mut result: Vec<String> = entries
            .iter()
            .rev()
            .filter(|e| e.kind == MemoryKind::EngInstruction)
            .take(max)
            .map(|e| e.note.clone())
            .collect();
        result.reverse();
        result
    }

    /// Serialise the most recent entries for the LLM prompt.
    /// `seconds_ago` is derived at read time.
    pub fn build_context(&self, max_recent: usize) -> Value {
        let entries = self.entries.lock().unwrap();
        let now = Instant::now();
        let skip = entries.len().saturating_sub(max_recent);

        let items: Vec<Value> = entries
            .iter()
            .skip(skip)
            .map(|e| {
                let mut entry = json!({
                    "seconds_ago": now.duration_since(e.timestamp).as_secs(),
                    "type": e.kind.as_wire(),
                    "note": e.note,
                });
                match e.kind {
                    MemoryKind::ActionTaken | MemoryKind::ActionRejected => {
                        if let Some(action) = &e.action {
                            entry["action"] = action.to_json();
                        }
                    }
                    MemoryKind::EngOverride => {
                        if let Some(ctx) = &e.context {
                            entry["channel"] = ctx.get("channel").cloned().unwrap_or(Value::Null);
                        }
                    }
                    MemoryKind::EngInstruction => {
                        entry["instruction"] = Value::String(e.note.clone());
                    }
                    MemoryKind::Observation | MemoryKind::MixSnapshot => {}
                }
                entry
            })
            .collect();

        Value::Array(items)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, entry: MemoryEntry) {
        let mut entries = self.entries.lock().unwrap();
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::schema::{ActionKind, MixAction};

    fn fader_action() -> MixAction {
        MixAction {
            kind: ActionKind::SetFader,
            channel: 2,
            value: 0.6,
            ..MixAction::default()
        }
    }

    #[test]
    fn test_fifo_eviction_beyond_capacity() {
        let mem = SessionMemory::new(3);
        for i in 0..5 {
            mem.record_observation(&format!("obs {}", i));
        }
        assert_eq!(mem.len(), 3);
        let ctx = mem.build_context(10);
        assert_eq!(ctx[0]["note"], "obs 2");
        assert_eq!(ctx[2]["note"], "obs 4");
    }

    #[test]
    fn test_build_context_returns_recent_slice() {
        let mem = SessionMemory::new(100);
        for i in 0..10 {
            mem.record_observation(&format!("obs {}", i));
        }
        let ctx = mem.build_context(3);
        let items = ctx.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["note"], "obs 7");
        assert!(items[0]["seconds_ago"].is_u64());
    }

    #[test]
    fn test_action_entries_carry_action_json() {
        let mem = SessionMemory::new(10);
        mem.record_action(&fader_action(), json!({"snapshot": true}));
        mem.record_rejection(&fader_action(), "too big a move");

        let ctx = mem.build_context(10);
        assert_eq!(ctx[0]["type"], "action_taken");
        assert_eq!(ctx[0]["action"]["channel"], 2);
        assert_eq!(ctx[1]["type"], "action_rejected");
        assert!(ctx[1]["note"].as_str().unwrap().contains("too big"));
    }

    #[test]
    fn test_active_instructions_tail_in_order() {
        let mem = SessionMemory::new(100);
        mem.record_instruction("keep vocals up");
        mem.record_observation("noise");
        mem.record_instruction("leave drums alone");
        mem.record_instruction("more reverb on snare");

        let instructions = mem.active_instructions(2);
        assert_eq!(instructions, vec!["leave drums alone", "more reverb on snare"]);
    }

    #[test]
    fn test_override_entry_carries_channel() {
        let mem = SessionMemory::new(10);
        mem.record_override(4, "fader moved");
        let ctx = mem.build_context(10);
        assert_eq!(ctx[0]["type"], "engineer_override");
        assert_eq!(ctx[0]["channel"], 4);
    }
}
