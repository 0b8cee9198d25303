//! The pipeline supervisor.
//!
//! Owns every worker thread and all shared state:
//! - event pump: applies adapter upcalls to the state mirror, in order
//! - DSP loop (50ms): keep-alive, FFT per captured channel, issue
//!   detection, the clipping emergency path, periodic snapshots
//! - LLM loop (5s): mix context -> decision engine -> approval queue
//! - executor loop: blocks on approved actions, validates, executes
//!
//! A single atomic running flag stops everything; threads are joined
//! and dirty preferences flushed on `stop`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use mixpilot_core::action::{ActionExecutor, ActionKind, ActionValidator, MixAction, Urgency};
use mixpilot_core::analysis::{AudioAnalyser, IssueKind, MeterBridge, MixIssue};
use mixpilot_core::approval::{ApprovalMode, ApprovalQueue, QueuedAction};
use mixpilot_core::audio::{AudioCapture, CaptureConfig, CpalCapture, FftAnalyser, NullCapture};
use mixpilot_core::console::{AdapterEvent, ChannelParam, ConsoleAdapter, ConsoleState, ParameterUpdate, UpdateTarget};
use mixpilot_core::discovery::sync::SyncProgress;
use mixpilot_core::discovery::{ChannelMap, DiscoveryOrchestrator, NameClassifier};
use mixpilot_core::llm::{DecisionEngine, GenrePreset, GenrePresetLibrary, PreferenceLearner, SessionMemory};

use crate::config::AgentConfig;
use crate::events::{AgentEvent, ConnectionStatus};

/// Fader updates arriving within this window of our own write are
/// echoes, not engineer overrides
const OVERRIDE_SUPPRESS_WINDOW: Duration = Duration::from_secs(3);

/// Everything the worker threads share.
struct Shared {
    config: AgentConfig,
    adapter: Arc<dyn ConsoleAdapter>,
    state: Arc<ConsoleState>,
    channel_map: Arc<ChannelMap>,
    analyser: AudioAnalyser,
    validator: ActionValidator,
    executor: ActionExecutor,
    queue: Arc<ApprovalQueue>,
    memory: SessionMemory,
    preferences: Arc<PreferenceLearner>,
    llm: Arc<DecisionEngine>,
    genre_preset: Option<GenrePreset>,
    name_classifier: NameClassifier,

    /// DSP thread writes, LLM thread reads; its own lock so the LLM
    /// tick never stalls the state mirror
    latest_issues: Mutex<Vec<MixIssue>>,
    running: AtomicBool,
    sync_progress: Arc<SyncProgress>,
    events: flume::Sender<AgentEvent>,
    /// Channel -> last executor write, for override detection
    recent_writes: Mutex<HashMap<usize, Instant>>,
}

pub struct Agent {
    shared: Arc<Shared>,
    events_rx: flume::Receiver<AgentEvent>,
    threads: Vec<JoinHandle<()>>,
}

impl Agent {
    pub fn new(adapter: Arc<dyn ConsoleAdapter>, config: AgentConfig) -> Self {
        let (events_tx, events_rx) = flume::unbounded();

        // Genre preset: library name first, then as a file path
        let mut library = GenrePresetLibrary::new();
        let genre_preset = if config.genre.is_empty() {
            None
        } else if let Some(preset) = library.get(&config.genre) {
            log::info!("Genre preset: {} - {}", preset.name, preset.description);
            Some(preset.clone())
        } else {
            match library.load_from_file(Path::new(&config.genre)) {
                Ok(name) => {
                    log::info!("Loaded custom genre preset from {}", config.genre);
                    library.get(&name).cloned()
                }
                Err(_) => {
                    log::warn!("Unknown genre preset: '{}'", config.genre);
                    None
                }
            }
        };

        // Preferences from previous sessions
        let preferences = Arc::new(PreferenceLearner::new());
        if !config.preferences_file.is_empty() {
            match preferences.load_from_file(Path::new(&config.preferences_file)) {
                Ok(()) => log::info!(
                    "Loaded {} preference decisions from {}",
                    preferences.total_decisions(),
                    config.preferences_file
                ),
                Err(e) => log::debug!("No saved preferences: {}", e),
            }
        }

        let state = Arc::new(ConsoleState::new());
        let channel_map = Arc::new(ChannelMap::new(0));
        let queue = Arc::new(ApprovalQueue::new(ApprovalMode::from_config(&config.approval_mode)));
        let llm = Arc::new(DecisionEngine::new(config.llm.clone()));
        let executor = ActionExecutor::new(adapter.clone(), state.clone());

        let shared = Arc::new(Shared {
            adapter,
            state,
            channel_map,
            analyser: AudioAnalyser::new(),
            validator: ActionValidator::new(),
            executor,
            queue,
            memory: SessionMemory::default(),
            preferences,
            llm,
            genre_preset,
            name_classifier: NameClassifier::new(),
            latest_issues: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            sync_progress: Arc::new(SyncProgress::new()),
            events: events_tx,
            recent_writes: Mutex::new(HashMap::new()),
            config,
        });

        Self { shared, events_rx, threads: Vec::new() }
    }

    /// Bring the whole pipeline up. Blocks through discovery (sync
    /// deadline plus settle time), then returns with all loops running.
    pub fn start(&mut self) -> anyhow::Result<()> {
        let shared = self.shared.clone();
        let caps = shared.adapter.capabilities();

        shared.state.init(caps.channel_count, caps.bus_count);
        shared.channel_map.resize(caps.channel_count);
        log::info!(
            "Agent starting - {} ({} ch, {} bus)",
            caps.model,
            caps.channel_count,
            caps.bus_count
        );

        // Rejections feed the preference learner
        {
            let preferences = shared.preferences.clone();
            shared.queue.set_rejection_callback(Box::new(move |action| {
                preferences.record_rejection(action, &action.role_name);
            }));
        }

        shared.running.store(true, Ordering::Release);

        // Event pump first: discovery needs sync replies applied
        self.spawn("adapter-events", |shared| event_pump_loop(&shared));

        shared.adapter.subscribe_meter(shared.config.meter_refresh_ms);

        // Audio capture; any failure degrades to console-meter analysis
        let mut capture: Box<dyn AudioCapture> = if shared.config.audio_channels > 0 {
            Box::new(CpalCapture::new())
        } else {
            log::info!("Audio capture disabled - using console meters only");
            Box::new(NullCapture)
        };
        if shared.config.audio_channels > 0 {
            let capture_config = CaptureConfig {
                device_id: shared.config.audio_device_id,
                channel_count: shared.config.audio_channels.min(caps.channel_count),
                sample_rate: shared.config.audio_sample_rate,
                frames_per_block: shared.config.audio_fft_size,
            };
            let mut opened = capture.open(&capture_config);
            if opened.is_ok() {
                opened = capture.start();
            }
            match opened {
                Ok(()) => log::info!(
                    "Audio capture started: {} ({} ch, {}Hz, FFT={})",
                    capture.backend_name(),
                    capture_config.channel_count,
                    capture_config.sample_rate,
                    capture_config.frames_per_block
                ),
                Err(e) => {
                    log::warn!(
                        "Audio capture unavailable ({}) - falling back to console meters only",
                        e
                    );
                    capture = Box::new(NullCapture);
                }
            }
        }

        // Channel discovery (blocks; LLM review continues async)
        log::info!("Running channel discovery...");
        DiscoveryOrchestrator::new(
            shared.adapter.clone(),
            shared.state.clone(),
            shared.channel_map.clone(),
            Some(shared.llm.clone()),
            shared.sync_progress.clone(),
        )
        .run();

        // Worker loops
        self.spawn("dsp", move |shared| dsp_loop(&shared, capture));
        self.spawn("llm", |shared| llm_loop(&shared));
        self.spawn("executor", |shared| executor_loop(&shared));

        publish_status(&shared);
        let _ = shared.events.send(AgentEvent::Status("Running".into()));
        log::info!(
            "Agent running - DSP@{}ms LLM@{}ms",
            shared.config.dsp_interval_ms,
            shared.config.llm_interval_ms
        );
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        log::info!("Agent stopping...");

        self.shared.adapter.unsubscribe_meter();
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }

        // Persist learned preferences for the next show
        let config = &self.shared.config;
        if !config.preferences_file.is_empty() && self.shared.preferences.is_dirty() {
            match self.shared.preferences.save_to_file(Path::new(&config.preferences_file)) {
                Ok(()) => log::info!("Saved preferences to {}", config.preferences_file),
                Err(e) => log::warn!("Failed to save preferences: {}", e),
            }
        }
        log::info!("Agent stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// The UI contract: everything the supervisor publishes.
    pub fn events(&self) -> flume::Receiver<AgentEvent> {
        self.events_rx.clone()
    }

    // Approval-queue passthroughs for the UI layer
    pub fn pending_actions(&self) -> Vec<QueuedAction> {
        self.shared.queue.pending()
    }

    pub fn approve(&self, index: usize) -> bool {
        self.shared.queue.approve(index)
    }

    pub fn reject(&self, index: usize) -> bool {
        self.shared.queue.reject(index)
    }

    pub fn approve_all(&self) {
        self.shared.queue.approve_all()
    }

    pub fn reject_all(&self) {
        self.shared.queue.reject_all()
    }

    /// Engineer chat: recorded as a standing instruction and answered
    /// by the LLM on a detached thread so nothing here blocks.
    pub fn chat(&self, message: &str) {
        log::info!("Engineer chat: {}", message);
        self.shared.memory.record_instruction(message);
        self.shared.preferences.record_instruction(message);

        let shared = self.shared.clone();
        let message = message.to_string();
        let spawn = std::thread::Builder::new()
            .name("chat".into())
            .spawn(move || handle_chat(&shared, &message));
        if let Err(e) = spawn {
            log::warn!("Could not spawn chat thread: {}", e);
        }
    }

    fn spawn<F>(&mut self, name: &str, f: F)
    where
        F: FnOnce(Arc<Shared>) + Send + 'static,
    {
        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || f(shared))
            .expect("failed to spawn agent thread");
        self.threads.push(handle);
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Event pump ───────────────────────────────────────────────────────

fn event_pump_loop(shared: &Shared) {
    log::debug!("Event pump started");
    let rx = shared.adapter.events();

    while shared.running.load(Ordering::Acquire) {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(AdapterEvent::Parameter(update)) => {
                shared.state.apply_update(&update);
                shared.sync_progress.note(&update);
                on_parameter_update(shared, &update);
            }
            Ok(AdapterEvent::Meter { channel, rms_db, peak_db }) => {
                shared.state.update_meter(channel, rms_db, peak_db);
            }
            Ok(AdapterEvent::Connection(connected)) => {
                if connected {
                    let _ = shared.events.send(AgentEvent::Status("Connected".into()));
                } else {
                    log::error!("Console disconnected!");
                    let _ = shared.events.send(AgentEvent::Status("DISCONNECTED".into()));
                }
                publish_status(shared);
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => {
                log::warn!("Adapter event channel closed");
                break;
            }
        }
    }
    log::debug!("Event pump stopped");
}

/// Live reclassification and engineer-override detection.
fn on_parameter_update(shared: &Shared, update: &ParameterUpdate) {
    if update.target != UpdateTarget::Channel {
        return;
    }

    match update.param {
        ChannelParam::Name => {
            let Some(mut profile) = shared.channel_map.profile(update.index) else {
                return;
            };
            if profile.manually_overridden {
                return;
            }
            let name = update.value.as_str();
            let result = shared.name_classifier.classify(name);
            profile.console_name = name.to_string();
            profile.normalised_name = name.trim().to_lowercase();
            profile.role = result.role;
            profile.group = result.group;
            profile.confidence = result.confidence;
            profile.last_updated = Instant::now();
            shared.channel_map.update_profile(profile);

            log::info!(
                "ch{} renamed to '{}' - reclassified as {}",
                update.index,
                name,
                result.role.as_str()
            );
            let _ = shared.events.send(AgentEvent::Log(format!(
                "Reclassified ch{} -> {}",
                update.index,
                result.role.as_str()
            )));
        }
        ChannelParam::Fader => {
            // A fader move we didn't initiate recently is the engineer
            let ours = shared
                .recent_writes
                .lock()
                .unwrap()
                .get(&update.index)
                .is_some_and(|at| at.elapsed() < OVERRIDE_SUPPRESS_WINDOW);
            if !ours {
                shared.memory.record_override(update.index, "fader moved");
            }
        }
        _ => {}
    }
}

// ── DSP loop ─────────────────────────────────────────────────────────

fn dsp_loop(shared: &Shared, mut capture: Box<dyn AudioCapture>) {
    log::debug!("DSP thread started");
    let mut fft = FftAnalyser::new(shared.config.audio_fft_size.max(64).next_power_of_two());
    let sample_rate = shared.config.audio_sample_rate as f32;
    let interval = Duration::from_millis(shared.config.dsp_interval_ms);
    let mut last_snapshot = Instant::now();
    let mut last_status = Instant::now();

    while shared.running.load(Ordering::Acquire) {
        let tick_start = Instant::now();

        shared.adapter.tick();

        // Drain captured audio: one FFT per channel per tick
        if capture.is_running() {
            let frames = fft.fft_size();
            capture.consume(frames, &mut |ch, block| {
                let result = fft.analyse(block, sample_rate);
                let channel = ch + 1;
                shared.analyser.update_fft(channel, result);
                shared.state.update_spectral(
                    channel,
                    mixpilot_core::console::SpectralData {
                        bass: result.bands.bass,
                        mid: result.bands.mid,
                        presence: result.bands.presence,
                        crest_factor: result.crest_factor,
                        spectral_centroid: result.spectral_centroid,
                    },
                );
            });
        }

        // Analyse and publish the latest issue set
        let analysis = shared.analyser.analyse(&shared.state);
        let issues = shared.analyser.detect_issues(&analysis);
        for issue in &issues {
            if matches!(
                issue.kind,
                IssueKind::Boomy | IssueKind::Harsh | IssueKind::Thin | IssueKind::Masking
            ) {
                let _ = shared.events.send(AgentEvent::Log(format!("DSP: {}", issue.description)));
            }
        }
        *shared.latest_issues.lock().unwrap() = issues;

        if analysis.has_feedback_risk {
            for warning in &analysis.warnings {
                let _ = shared.events.send(AgentEvent::Log(format!("!! {}", warning)));
            }
        }

        // Emergency path: clipping bypasses the LLM entirely
        if analysis.has_clipping {
            emergency_clipping_fix(shared, analysis.clipping_channel);
        }

        // Periodic compact snapshot for session memory
        if last_snapshot.elapsed() >= Duration::from_millis(shared.config.snapshot_interval_ms) {
            let bridge = MeterBridge::new(&shared.state, &shared.channel_map);
            shared.memory.record_snapshot(bridge.build_compact_state());
            last_snapshot = Instant::now();
        }

        if last_status.elapsed() >= Duration::from_secs(5) {
            publish_status(shared);
            last_status = Instant::now();
        }

        sleep_remainder(shared, interval, tick_start);
    }

    capture.stop();
    log::debug!("DSP thread stopped");
}

/// Console meters lag our own writes; don't cut the same channel again
/// until they have had a chance to reflect the last fix
const EMERGENCY_COOLDOWN: Duration = Duration::from_secs(1);

/// Propose and (mode permitting) immediately apply a fader cut on a
/// clipping channel. Latency budget is one DSP tick plus a validator
/// pass, so no LLM round-trip here.
fn emergency_clipping_fix(shared: &Shared, channel: usize) {
    let recently_cut = shared
        .recent_writes
        .lock()
        .unwrap()
        .get(&channel)
        .is_some_and(|at| at.elapsed() < EMERGENCY_COOLDOWN);
    if recently_cut {
        return;
    }

    let Some(snapshot) = shared.state.channel(channel) else {
        return;
    };

    let fix = MixAction {
        kind: ActionKind::SetFader,
        channel,
        value: snapshot.fader * 0.9, // roughly -1dB
        urgency: Urgency::Immediate,
        reason: "Clipping detected - reducing level".into(),
        ..MixAction::default()
    };

    // Auto-approved submissions are executed here and nowhere else
    if shared.queue.submit(fix.clone()) {
        let vr = shared.validator.validate(&fix, &shared.state);
        if vr.valid {
            mark_write(shared, vr.clamped.channel);
            let er = shared.executor.execute(&vr.clamped);
            if er.success {
                let _ = shared
                    .events
                    .send(AgentEvent::Log(format!("Emergency: {}", vr.clamped.describe())));
            } else {
                log::warn!("Emergency fader cut failed: {}", er.error);
            }
        }
    }
}

// ── LLM loop ─────────────────────────────────────────────────────────

fn llm_loop(shared: &Shared) {
    log::debug!("LLM thread started");

    // Let discovery and first meters land before the first decision
    sleep_while_running(shared, Duration::from_secs(2));

    let interval = Duration::from_millis(shared.config.llm_interval_ms);
    while shared.running.load(Ordering::Acquire) {
        let tick_start = Instant::now();

        let mix_context = build_mix_context(shared);
        let session_context = shared.memory.build_context(20);

        match shared.llm.decide_mix_actions(&mix_context, &session_context) {
            Ok(actions) => {
                log::debug!("LLM returned {} actions", actions.len());
                for action in actions {
                    process_llm_action(shared, action, &mix_context);
                }
            }
            Err(e) => log::error!("LLM tick failed: {}", e),
        }

        sleep_remainder(shared, interval, tick_start);
    }
    log::debug!("LLM thread stopped");
}

/// Route one LLM-proposed action through the pipeline.
fn process_llm_action(shared: &Shared, action: MixAction, mix_context: &Value) {
    match action.kind {
        ActionKind::NoAction => {
            log::debug!("LLM: no action needed - {}", action.reason);
        }
        ActionKind::Observation => {
            shared.memory.record_observation(&action.reason);
            let _ = shared.events.send(AgentEvent::Log(format!("LLM: {}", action.reason)));
        }
        _ => {
            if shared.queue.submit(action.clone()) {
                // Auto-approved: validate and execute on this thread
                let vr = shared.validator.validate(&action, &shared.state);
                if !vr.valid {
                    log::warn!("Validation failed: {}", vr.warning);
                    return;
                }
                if vr.clamped.kind == ActionKind::SetFader {
                    mark_write(shared, vr.clamped.channel);
                }
                let er = shared.executor.execute(&vr.clamped);
                if er.success {
                    shared.memory.record_action(&vr.clamped, mix_context.clone());
                    let _ = shared
                        .events
                        .send(AgentEvent::Log(format!("Auto: {}", vr.clamped.describe())));
                } else {
                    log::warn!("Execution failed: {}", er.error);
                }
            } else {
                let _ = shared
                    .events
                    .send(AgentEvent::Log(format!("Queued: {}", action.describe())));
            }
        }
    }
}

/// Mix state + issues + instructions + preset + preferences.
fn build_mix_context(shared: &Shared) -> Value {
    let issues = shared.latest_issues.lock().unwrap().clone();
    let bridge = MeterBridge::new(&shared.state, &shared.channel_map);
    let mut state = bridge.build_mix_state(&issues);

    let instructions = shared.memory.active_instructions(10);
    if !instructions.is_empty() {
        state["engineer_instructions"] = json!(instructions);
    }

    state["analysis_source"] = if shared.analyser.has_fft_data() {
        json!("fft_audio")
    } else {
        json!("console_meters")
    };

    if let Some(preset) = &shared.genre_preset {
        state["genre_preset"] = preset.to_json();
    }

    let prefs = shared.preferences.build_preferences();
    if prefs.as_object().is_some_and(|o| !o.is_empty()) {
        state["engineer_preferences"] = prefs;
    }

    state
}

// ── Executor loop ────────────────────────────────────────────────────

fn executor_loop(shared: &Shared) {
    log::debug!("Executor thread started");

    while shared.running.load(Ordering::Acquire) {
        let Some(entry) = shared.queue.pop_approved(Duration::from_millis(200)) else {
            continue;
        };

        let vr = shared.validator.validate(&entry.action, &shared.state);
        if !vr.valid {
            log::warn!("Validation failed for approved action: {}", vr.warning);
            shared.memory.record_rejection(&entry.action, &vr.warning);
            continue;
        }

        if vr.clamped.kind == ActionKind::SetFader {
            mark_write(shared, vr.clamped.channel);
        }
        let er = shared.executor.execute(&vr.clamped);
        if er.success {
            let bridge = MeterBridge::new(&shared.state, &shared.channel_map);
            shared.memory.record_action(&vr.clamped, bridge.build_compact_state());
            let label = if entry.expired { "Expired-approved" } else { "Approved" };
            let _ = shared
                .events
                .send(AgentEvent::Log(format!("{}: {}", label, vr.clamped.describe())));
            shared.preferences.record_approval(&vr.clamped, &vr.clamped.role_name);
        } else {
            log::warn!("Execution failed: {}", er.error);
            let _ = shared.events.send(AgentEvent::Log(format!("Failed: {}", er.error)));
        }
    }
    log::debug!("Executor thread stopped");
}

// ── Chat ─────────────────────────────────────────────────────────────

const CHAT_SYSTEM_PROMPT: &str = r#"You are an expert live sound engineer AI assistant.
The engineer has sent you a message. Respond conversationally AND suggest
specific mix actions if appropriate.

If the message is a question about the current mix, answer it based on the
mix state provided.

If the message is an instruction (e.g. "bring up the vocals", "leave the
drums alone", "more reverb on the snare"), acknowledge it and produce actions.

Respond with JSON:
{
  "reply": "Your conversational response to the engineer",
  "actions": [
    {
      "action": "set_fader|set_eq|set_comp|set_hpf|set_send|mute|unmute|no_action|observation",
      "channel": 1, "role": "Kick", "value": 0.75,
      "value2": 0.0, "value3": 1.0, "band": 1, "aux": 0,
      "urgency": "normal", "reason": "explanation"
    }
  ]
}"#;

fn handle_chat(shared: &Shared, message: &str) {
    let mix_context = build_mix_context(shared);
    let chat_prompt = json!({
        "mix_state": mix_context,
        "recent_history": shared.memory.build_context(10),
        "engineer_says": message,
    });

    let response = match shared.llm.call_raw(CHAT_SYSTEM_PROMPT, &chat_prompt.to_string()) {
        Ok(r) => r,
        Err(e) => {
            log::error!("Chat LLM call failed: {}", e);
            let _ = shared
                .events
                .send(AgentEvent::ChatReply(format!("Error: couldn't reach the LLM - {}", e)));
            return;
        }
    };

    let Ok(j) = serde_json::from_str::<Value>(&response) else {
        // Not JSON: treat the whole response as a plain text reply
        let reply: String = response.chars().take(200).collect();
        let _ = shared.events.send(AgentEvent::ChatReply(reply));
        return;
    };

    if let Some(reply) = j.get("reply").and_then(Value::as_str) {
        if !reply.is_empty() {
            let _ = shared.events.send(AgentEvent::ChatReply(reply.to_string()));
        }
    }

    if let Some(actions) = j.get("actions").and_then(Value::as_array) {
        for item in actions {
            let action = MixAction::from_json(item);
            if matches!(action.kind, ActionKind::NoAction | ActionKind::Observation) {
                if !action.reason.is_empty() {
                    let _ = shared.events.send(AgentEvent::Log(format!("LLM: {}", action.reason)));
                }
                continue;
            }
            process_llm_action(shared, action, &mix_context);
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn mark_write(shared: &Shared, channel: usize) {
    shared.recent_writes.lock().unwrap().insert(channel, Instant::now());
}

fn publish_status(shared: &Shared) {
    let caps = shared.adapter.capabilities();
    let status = ConnectionStatus {
        console_connected: shared.adapter.is_connected(),
        console_model: caps.model,
        audio_running: shared.analyser.has_fft_data(),
        audio_backend: if shared.config.audio_channels > 0 { "cpal" } else { "none" }.into(),
        audio_channels: shared.config.audio_channels,
        audio_sample_rate: shared.config.audio_sample_rate,
        // Assumed up; transport failures surface in the log
        llm_connected: true,
    };
    let _ = shared.events.send(AgentEvent::Connection(status));
}

/// Sleep out the rest of a loop interval, staying responsive to stop.
fn sleep_remainder(shared: &Shared, interval: Duration, tick_start: Instant) {
    let elapsed = tick_start.elapsed();
    if elapsed < interval {
        sleep_while_running(shared, interval - elapsed);
    }
}

fn sleep_while_running(shared: &Shared, total: Duration) {
    let deadline = Instant::now() + total;
    while shared.running.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}
