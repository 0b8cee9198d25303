//! Executes validated actions on the console.
//!
//! Fader moves are ramped over ~200ms so the PA never jumps audibly;
//! everything else is a one-shot write. Errors are returned, never
//! panicked - the caller decides whether to log or retry.

use std::sync::Arc;
use std::time::Duration;

use crate::console::adapter::ConsoleAdapter;
use crate::console::params::{ChannelParam, ParamValue};
use crate::console::state::ConsoleState;

use super::schema::{ActionKind, MixAction};

/// Outcome of one execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    /// What was actually set after ramping
    pub actual_value: f32,
    pub error: String,
}

impl ExecutionResult {
    fn ok(actual_value: f32) -> Self {
        Self { success: true, actual_value, error: String::new() }
    }

    fn err(error: impl Into<String>) -> Self {
        Self { success: false, actual_value: 0.0, error: error.into() }
    }
}

/// Fader moves below this are a single write
const RAMP_THRESHOLD: f32 = 0.02;
const RAMP_STEPS: usize = 10;
const RAMP_STEP_INTERVAL: Duration = Duration::from_millis(20);

pub struct ActionExecutor {
    adapter: Arc<dyn ConsoleAdapter>,
    state: Arc<ConsoleState>,
}

impl ActionExecutor {
    pub fn new(adapter: Arc<dyn ConsoleAdapter>, state: Arc<ConsoleState>) -> Self {
        Self { adapter, state }
    }

    pub fn execute(&self, action: &MixAction) -> ExecutionResult {
        match action.kind {
            ActionKind::SetFader => self.execute_fader(action),
            ActionKind::SetPan => {
                self.adapter.set_channel_param(
                    action.channel,
                    ChannelParam::Pan,
                    ParamValue::Float(action.value),
                );
                log::info!("Executed: ch{} pan -> {:.2}", action.channel, action.value);
                ExecutionResult::ok(action.value)
            }
            ActionKind::SetEqBand => self.execute_eq(action),
            ActionKind::SetCompressor => {
                self.set_float(action.channel, ChannelParam::CompThreshold, action.value);
                self.set_float(action.channel, ChannelParam::CompRatio, action.value2);
                self.set_bool(action.channel, ChannelParam::CompOn, true);
                log::info!(
                    "Executed: ch{} comp thresh={:.1}dB ratio={:.1}:1",
                    action.channel,
                    action.value,
                    action.value2
                );
                ExecutionResult::ok(action.value)
            }
            ActionKind::SetGate => {
                self.set_float(action.channel, ChannelParam::GateThreshold, action.value);
                self.set_bool(action.channel, ChannelParam::GateOn, true);
                log::info!("Executed: ch{} gate thresh={:.1}dB", action.channel, action.value);
                ExecutionResult::ok(action.value)
            }
            ActionKind::SetHighPass => {
                self.set_float(action.channel, ChannelParam::HighPassFreq, action.value);
                self.set_bool(action.channel, ChannelParam::HighPassOn, true);
                log::info!("Executed: ch{} HPF -> {:.0}Hz", action.channel, action.value);
                ExecutionResult::ok(action.value)
            }
            ActionKind::SetSendLevel => {
                self.adapter.set_send_level(action.channel, action.aux_index, action.value);
                log::info!(
                    "Executed: ch{} send to bus{} -> {:.2}",
                    action.channel,
                    action.aux_index,
                    action.value
                );
                ExecutionResult::ok(action.value)
            }
            ActionKind::MuteChannel => {
                self.set_bool(action.channel, ChannelParam::Mute, true);
                log::info!("Executed: mute ch{}", action.channel);
                ExecutionResult::ok(1.0)
            }
            ActionKind::UnmuteChannel => {
                self.set_bool(action.channel, ChannelParam::Mute, false);
                log::info!("Executed: unmute ch{}", action.channel);
                ExecutionResult::ok(0.0)
            }
            ActionKind::NoAction | ActionKind::Observation => ExecutionResult::ok(0.0),
        }
    }

    fn execute_fader(&self, action: &MixAction) -> ExecutionResult {
        let Some(snapshot) = self.state.channel(action.channel) else {
            return ExecutionResult::err(format!("Unknown channel {}", action.channel));
        };
        let current = snapshot.fader;
        let target = action.value;
        let delta = target - current;

        if delta.abs() < RAMP_THRESHOLD {
            self.set_float(action.channel, ChannelParam::Fader, target);
            log::info!("Executed: ch{} fader {:.2} -> {:.2}", action.channel, current, target);
            return ExecutionResult::ok(target);
        }

        // Ramp over ~200ms in 10 steps, then land exactly on target
        let step = delta / RAMP_STEPS as f32;
        let mut value = current;
        for _ in 0..RAMP_STEPS {
            value += step;
            self.set_float(action.channel, ChannelParam::Fader, value);
            std::thread::sleep(RAMP_STEP_INTERVAL);
        }
        self.set_float(action.channel, ChannelParam::Fader, target);

        log::info!(
            "Executed: ch{} fader {:.2} -> {:.2} (ramped)",
            action.channel,
            current,
            target
        );
        ExecutionResult::ok(target)
    }

    fn execute_eq(&self, action: &MixAction) -> ExecutionResult {
        let band = action.band_index;
        if !(1..=6).contains(&band) {
            return ExecutionResult::err(format!("Invalid EQ band {}", band));
        }
        let band = band as u8;

        self.set_float(action.channel, ChannelParam::EqFreq(band), action.value);
        self.set_float(action.channel, ChannelParam::EqGain(band), action.value2);
        self.set_float(action.channel, ChannelParam::EqQ(band), action.value3);

        log::info!(
            "Executed: ch{} EQ band{} {:.0}Hz {:.1}dB Q={:.1}",
            action.channel,
            band,
            action.value,
            action.value2,
            action.value3
        );
        ExecutionResult::ok(action.value2)
    }

    fn set_float(&self, ch: usize, param: ChannelParam, value: f32) {
        self.adapter.set_channel_param(ch, param, ParamValue::Float(value));
    }

    fn set_bool(&self, ch: usize, param: ChannelParam, value: bool) {
        self.adapter.set_channel_param(ch, param, ParamValue::Bool(value));
    }
}
