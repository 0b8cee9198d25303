//! LLM integration: the decision engine transport, rolling session
//! memory, learned engineer preferences and genre mix targets.

pub mod engine;
pub mod memory;
pub mod prefs;
pub mod presets;

pub use engine::{DecisionEngine, LlmConfig, LlmError};
pub use memory::{MemoryKind, SessionMemory};
pub use prefs::PreferenceLearner;
pub use presets::{GenrePreset, GenrePresetLibrary, RoleMixTarget};
