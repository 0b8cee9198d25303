//! Events published by the supervisor for the UI layer.
//!
//! The terminal UI is a separate concern; the agent only emits these
//! over a flume channel. A headless run drains them to the log.

/// Connection indicator refreshed every few seconds.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    pub console_connected: bool,
    pub console_model: String,
    pub audio_running: bool,
    pub audio_backend: String,
    pub audio_channels: usize,
    pub audio_sample_rate: u32,
    pub llm_connected: bool,
}

#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// One line for the scrolling activity log
    Log(String),
    /// Conversational reply to an engineer chat message
    ChatReply(String),
    /// Short status line ("Running", "DISCONNECTED", ...)
    Status(String),
    /// Periodic connection indicator refresh
    Connection(ConnectionStatus),
}
