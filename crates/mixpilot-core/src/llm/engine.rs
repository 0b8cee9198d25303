//! Blocking LLM transport.
//!
//! Primary is an Anthropic-style messages API; fallback is an
//! Ollama-style generate endpoint for fully-local operation. Which one
//! leads is a config choice - with no API key the engine flips itself
//! to local-primary. Only the LLM thread (and one-shot discovery /
//! chat threads) ever block in here.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::action::schema::MixAction;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed API response: {0}")]
    Response(String),

    #[error("All LLM backends failed")]
    AllBackendsFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Anthropic-style API key; empty switches to local-primary
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    /// Fall back to the other backend when the primary fails
    #[serde(default = "default_true")]
    pub use_fallback: bool,
    /// Use the local model as primary (fully local mode)
    #[serde(default)]
    pub ollama_primary: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Low temperature keeps decisions consistent
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_ollama_host() -> String {
    "http://localhost:11434".into()
}
fn default_ollama_model() -> String {
    "llama3:8b".into()
}
fn default_true() -> bool {
    true
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.3
}
fn default_timeout_ms() -> u64 {
    5000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            ollama_host: default_ollama_host(),
            ollama_model: default_ollama_model(),
            use_fallback: true,
            ollama_primary: false,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

pub struct DecisionEngine {
    config: LlmConfig,
    client: reqwest::blocking::Client,
    total_calls: AtomicU32,
    failed_calls: AtomicU32,
    total_latency_ms: AtomicU64,
}

impl DecisionEngine {
    pub fn new(mut config: LlmConfig) -> Self {
        if config.api_key.is_empty() && !config.ollama_primary {
            log::info!("No API key configured - using local model as primary");
            config.ollama_primary = true;
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1000)))
            .build()
            .unwrap_or_default();

        Self {
            config,
            client,
            total_calls: AtomicU32::new(0),
            failed_calls: AtomicU32::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    /// Main decision call: given mix state and session context, return
    /// the model's proposed actions. Malformed entries come back as
    /// NoAction; a non-array response yields an empty list.
    pub fn decide_mix_actions(
        &self,
        mix_state: &Value,
        session_context: &Value,
    ) -> Result<Vec<MixAction>, LlmError> {
        let prompt = json!({
            "mix_state": mix_state,
            "recent_history": session_context,
        });
        let response = self.call_raw(&mix_system_prompt(), &prompt.to_string())?;
        Ok(parse_actions(&response))
    }

    /// Raw call for the discovery review and chat paths.
    pub fn call_raw(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let result = if self.config.ollama_primary {
            self.call_with_fallback(
                |e| e.call_ollama(system_prompt, user_message),
                |e| e.call_anthropic(system_prompt, user_message),
                !self.config.api_key.is_empty(),
            )
        } else {
            self.call_with_fallback(
                |e| e.call_anthropic(system_prompt, user_message),
                |e| e.call_ollama(system_prompt, user_message),
                self.config.use_fallback,
            )
        };

        let elapsed = start.elapsed().as_millis() as u64;
        self.total_latency_ms.fetch_add(elapsed, Ordering::Relaxed);

        match result {
            Ok(response) => {
                log::debug!("LLM response in {}ms ({} chars)", elapsed, response.len());
                Ok(response)
            }
            Err(e) => {
                self.failed_calls.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    fn call_with_fallback(
        &self,
        primary: impl Fn(&Self) -> Result<String, LlmError>,
        fallback: impl Fn(&Self) -> Result<String, LlmError>,
        fallback_enabled: bool,
    ) -> Result<String, LlmError> {
        match primary(self) {
            Ok(r) => Ok(r),
            Err(e) => {
                log::warn!("Primary LLM call failed: {}", e);
                if !fallback_enabled {
                    return Err(e);
                }
                fallback(self).map_err(|e2| {
                    log::error!("Fallback LLM call also failed: {}", e2);
                    LlmError::AllBackendsFailed
                })
            }
        }
    }

    fn call_anthropic(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        if self.config.api_key.is_empty() {
            return Err(LlmError::Http("no API key".into()));
        }

        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": system_prompt,
            "messages": [{ "role": "user", "content": user_message }],
        });

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().map_err(|e| LlmError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let j: Value =
            serde_json::from_str(&text).map_err(|e| LlmError::Response(e.to_string()))?;
        j.get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::Response("missing content[0].text".into()))
    }

    fn call_ollama(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.config.ollama_model,
            "stream": false,
            "system": system_prompt,
            "prompt": user_message,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens,
            },
        });

        let url = format!("{}/api/generate", self.config.ollama_host.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            // Local models can be slow; give them longer than the API path
            .timeout(Duration::from_secs(30))
            .json(&body)
            .send()
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LlmError::Status { status: status.as_u16(), body: String::new() });
        }

        let j: Value = resp.json().map_err(|e| LlmError::Response(e.to_string()))?;
        Ok(j.get("response").and_then(Value::as_str).unwrap_or("").to_string())
    }

    pub fn total_calls(&self) -> u32 {
        self.total_calls.load(Ordering::Relaxed)
    }

    pub fn failed_calls(&self) -> u32 {
        self.failed_calls.load(Ordering::Relaxed)
    }

    pub fn avg_latency_ms(&self) -> f32 {
        let calls = self.total_calls();
        if calls == 0 {
            return 0.0;
        }
        self.total_latency_ms.load(Ordering::Relaxed) as f32 / calls as f32
    }
}

/// System prompt for the periodic mix decision call.
fn mix_system_prompt() -> String {
    r#"You are an expert live sound engineer AI assistant.
You are given the current state of a live mixing console and recent history.
Analyse the mix and suggest specific, safe adjustments.

RULES:
- Never change faders by more than 6dB in a single step
- Never boost EQ by more than 3dB in a single step - cuts are safer than boosts
- For feedback risks, suggest CUTS, never boosts
- Always prioritize vocal clarity
- Lead vocals should sit 4-6dB above backing vocals in the mix
- If something sounds fine, respond with no_action
- Kick and bass should not mask each other - use HPF separation or EQ notching
- Be conservative - small changes that compound over time
- CRITICAL: If "engineer_instructions" are present in the mix state, those are
  direct instructions from the human engineer. Follow them. They take priority
  over your own analysis. If the engineer says "leave the drums alone", do not
  suggest any drum changes. If the engineer says "more vocals", prioritize that.

Respond with a JSON array of actions:
[
  {
    "action": "set_fader|set_pan|set_eq|set_comp|set_gate|set_hpf|set_send|mute|unmute|no_action|observation",
    "channel": 1,
    "role": "Kick",
    "value": 0.75,
    "value2": 0.0,
    "value3": 1.0,
    "band": 1,
    "aux": 0,
    "urgency": "immediate|fast|normal|low",
    "reason": "brief explanation"
  }
]

For set_eq: value=frequency_hz, value2=gain_db, value3=q_factor, band=1-6
For set_comp: value=threshold_db, value2=ratio
For set_hpf: value=frequency_hz
For set_fader: value=0.0-1.0 normalized"#
        .to_string()
}

/// Extract the first JSON array from a response and parse each entry.
/// Entries that fail to parse become NoAction; a response with no array
/// yields nothing.
pub fn parse_actions(response: &str) -> Vec<MixAction> {
    let Some(start) = response.find('[') else {
        log::warn!("LLM response contains no JSON array");
        return Vec::new();
    };
    let Some(end) = response.rfind(']') else {
        log::warn!("LLM response contains no JSON array");
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(&response[start..=end]) {
        Ok(Value::Array(items)) => items.iter().map(MixAction::from_json).collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            log::error!("Failed to parse LLM actions: {}", e);
            Vec::new()
        }
    }
}
