//! Mix analysis: per-channel metering/spectral analysis, issue
//! detection and the JSON bridge that feeds the LLM.

pub mod analyser;
pub mod bridge;

pub use analyser::{AudioAnalyser, ChannelAnalysis, IssueKind, MixAnalysis, MixIssue};
pub use bridge::MeterBridge;
