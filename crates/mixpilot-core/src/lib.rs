//! mixpilot core - shared engine for the live-sound co-pilot
//!
//! Everything between the console wire protocol and the LLM lives here:
//! the console state mirror, audio capture and spectral analysis,
//! channel discovery, and the propose → validate → approve → execute
//! action pipeline. The agent binary wires these into its loops.

pub mod action;
pub mod analysis;
pub mod approval;
pub mod audio;
pub mod config;
pub mod console;
pub mod discovery;
pub mod llm;
pub mod types;

pub use types::*;
