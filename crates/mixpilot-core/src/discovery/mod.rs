//! Channel discovery: who is on which channel, and how sure are we.
//!
//! Discovery composes a full console sync, spectral fingerprinting,
//! local name/spectral classification, stereo-pair detection and an
//! optional asynchronous LLM review into the [`ChannelMap`].

pub mod channel_map;
pub mod names;
pub mod orchestrator;
pub mod pairs;
pub mod profile;
pub mod review;
pub mod spectral;
pub mod sync;

pub use channel_map::ChannelMap;
pub use names::NameClassifier;
pub use orchestrator::DiscoveryOrchestrator;
pub use pairs::StereoPairDetector;
pub use profile::{ChannelProfile, Confidence, Fingerprint, Role};
pub use spectral::SpectralClassifier;
