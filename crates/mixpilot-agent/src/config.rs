//! Agent configuration, loaded from a YAML show file.

use serde::{Deserialize, Serialize};

use mixpilot_core::llm::LlmConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// "sim" ships in-tree; hardware adapters plug in behind the trait
    pub console_type: String,
    pub console_host: String,
    /// 0 picks the default port for the console type
    pub console_port: u16,

    pub dsp_interval_ms: u64,
    pub llm_interval_ms: u64,
    pub meter_refresh_ms: u32,
    pub snapshot_interval_ms: u64,

    /// approve_all | auto_urgent | auto_all | deny_all
    pub approval_mode: String,
    pub headless: bool,

    /// Genre preset name ("rock") or a path to a preset JSON file
    pub genre: String,
    /// Learned preferences persist here; empty disables persistence
    pub preferences_file: String,

    /// 0 disables audio capture (console meters only)
    pub audio_channels: usize,
    pub audio_device_id: i32,
    pub audio_sample_rate: u32,
    pub audio_fft_size: usize,

    pub llm: LlmConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            console_type: "sim".into(),
            console_host: "192.168.1.100".into(),
            console_port: 0,
            dsp_interval_ms: 50,
            llm_interval_ms: 5000,
            meter_refresh_ms: 50,
            snapshot_interval_ms: 10_000,
            approval_mode: "auto_urgent".into(),
            headless: false,
            genre: String::new(),
            preferences_file: String::new(),
            audio_channels: 0,
            audio_device_id: -1,
            audio_sample_rate: 48_000,
            audio_fft_size: 1024,
            llm: LlmConfig::default(),
        }
    }
}
