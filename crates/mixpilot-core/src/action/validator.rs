//! The safety layer. Every action passes through here before it can
//! touch the console; values are clamped into safe ranges and fader
//! moves are limited to small steps.

use crate::console::state::ConsoleState;

use super::schema::{ActionKind, MixAction};

/// Clamp limits applied by the validator.
///
/// Sign convention: `max_eq_cut_db` is the *lower* bound on EQ gain and
/// stays negative; `max_eq_boost_db` is the upper bound and is positive.
/// Cuts are allowed to go deeper than boosts - boosting into feedback
/// is the failure mode this asymmetry guards against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyLimits {
    /// Max normalized fader move per step (~6dB)
    pub max_fader_delta_norm: f32,
    /// Max EQ boost per step, dB (positive)
    pub max_eq_boost_db: f32,
    /// Max EQ cut per step, dB (negative)
    pub max_eq_cut_db: f32,
    /// Compressor threshold floor, dB
    pub max_comp_threshold_db: f32,
    pub min_comp_ratio: f32,
    pub max_comp_ratio: f32,
    /// Don't high-pass above this, Hz
    pub max_hpf_hz: f32,
    pub min_hpf_hz: f32,
    /// Max send level change per step
    pub max_send_delta: f32,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_fader_delta_norm: 0.15,
            max_eq_boost_db: 3.0,
            max_eq_cut_db: -12.0,
            max_comp_threshold_db: -50.0,
            min_comp_ratio: 1.0,
            max_comp_ratio: 20.0,
            max_hpf_hz: 400.0,
            min_hpf_hz: 20.0,
            max_send_delta: 0.2,
        }
    }
}

/// Outcome of validating one action.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub valid: bool,
    /// The action after safety clamping
    pub clamped: MixAction,
    /// Populated when something was clamped or rejected
    pub warning: String,
}

impl ValidationResult {
    fn pass(action: MixAction) -> Self {
        Self { valid: true, clamped: action, warning: String::new() }
    }

    fn fail(action: MixAction, warning: String) -> Self {
        Self { valid: false, clamped: action, warning }
    }
}

/// Stateless validator; reads current state only to limit deltas.
#[derive(Default)]
pub struct ActionValidator {
    limits: SafetyLimits,
}

impl ActionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: SafetyLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    pub fn validate(&self, action: &MixAction, state: &ConsoleState) -> ValidationResult {
        match action.kind {
            ActionKind::SetFader => self.validate_fader(action, state),
            ActionKind::SetEqBand => self.validate_eq(action),
            ActionKind::SetCompressor => self.validate_comp(action),
            ActionKind::SetHighPass => self.validate_hpf(action),
            ActionKind::SetSendLevel => self.validate_send(action, state),
            ActionKind::MuteChannel | ActionKind::UnmuteChannel => {
                log::info!(
                    "Validator: {} ch{}",
                    if action.kind == ActionKind::MuteChannel { "mute" } else { "unmute" },
                    action.channel
                );
                ValidationResult::pass(action.clone())
            }
            ActionKind::SetPan | ActionKind::SetGate => ValidationResult::pass(action.clone()),
            ActionKind::NoAction | ActionKind::Observation => {
                ValidationResult::pass(action.clone())
            }
        }
    }

    fn validate_fader(&self, action: &MixAction, state: &ConsoleState) -> ValidationResult {
        let Some(snapshot) = state.channel(action.channel) else {
            return ValidationResult::fail(
                action.clone(),
                format!("Invalid channel {}", action.channel),
            );
        };

        let current = snapshot.fader;
        let mut target = action.value.clamp(0.0, 1.0);
        let mut warning = String::new();

        let delta = target - current;
        if delta.abs() > self.limits.max_fader_delta_norm {
            target = current + self.limits.max_fader_delta_norm.copysign(delta);
            warning = format!(
                "Fader clamped: requested {:.2} -> clamped to {:.2}",
                action.value, target
            );
            log::warn!("Validator: {}", warning);
        }

        let mut clamped = action.clone();
        clamped.value = target;
        ValidationResult { valid: true, clamped, warning }
    }

    fn validate_eq(&self, action: &MixAction) -> ValidationResult {
        let mut warning = String::new();

        let mut gain = action.value2;
        if gain > self.limits.max_eq_boost_db {
            gain = self.limits.max_eq_boost_db;
            warning = format!("EQ boost clamped to {}dB", self.limits.max_eq_boost_db);
            log::warn!("Validator: {}", warning);
        }
        if gain < self.limits.max_eq_cut_db {
            gain = self.limits.max_eq_cut_db;
            warning = format!("EQ cut clamped to {}dB", self.limits.max_eq_cut_db);
        }

        let mut clamped = action.clone();
        clamped.value = action.value.clamp(20.0, 20_000.0);
        clamped.value2 = gain;
        clamped.value3 = action.value3.clamp(0.1, 20.0);
        ValidationResult { valid: true, clamped, warning }
    }

    fn validate_comp(&self, action: &MixAction) -> ValidationResult {
        let mut clamped = action.clone();
        clamped.value = action.value.clamp(self.limits.max_comp_threshold_db, 0.0);
        clamped.value2 = action
            .value2
            .clamp(self.limits.min_comp_ratio, self.limits.max_comp_ratio);
        ValidationResult::pass(clamped)
    }

    fn validate_hpf(&self, action: &MixAction) -> ValidationResult {
        let freq = action.value.clamp(self.limits.min_hpf_hz, self.limits.max_hpf_hz);
        let mut warning = String::new();
        if freq != action.value {
            warning = format!("HPF clamped: {:.0}Hz -> {:.0}Hz", action.value, freq);
            log::warn!("Validator: {}", warning);
        }
        let mut clamped = action.clone();
        clamped.value = freq;
        ValidationResult { valid: true, clamped, warning }
    }

    fn validate_send(&self, action: &MixAction, state: &ConsoleState) -> ValidationResult {
        if state.channel(action.channel).is_none() {
            return ValidationResult::fail(action.clone(), "Invalid channel".into());
        }
        let mut clamped = action.clone();
        clamped.value = action.value.clamp(0.0, 1.0);
        ValidationResult::pass(clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::schema::Urgency;
    use crate::console::params::{ChannelParam, ParameterUpdate};

    fn state_with_fader(ch: usize, fader: f32) -> ConsoleState {
        let s = ConsoleState::new();
        s.init(8, 4);
        s.apply_update(&ParameterUpdate::channel_float(ch, ChannelParam::Fader, fader));
        s
    }

    fn fader_action(ch: usize, value: f32) -> MixAction {
        MixAction {
            kind: ActionKind::SetFader,
            channel: ch,
            value,
            urgency: Urgency::Normal,
            ..MixAction::default()
        }
    }

    #[test]
    fn test_fader_delta_limit() {
        let state = state_with_fader(1, 0.5);
        let v = ActionValidator::new();

        // Jump from 0.5 to 1.0 exceeds the 0.15 step limit
        let r = v.validate(&fader_action(1, 1.0), &state);
        assert!(r.valid);
        assert!((r.clamped.value - 0.65).abs() < 1e-6);
        assert!(!r.warning.is_empty());

        // Downward jump clamps the other way
        let r = v.validate(&fader_action(1, 0.0), &state);
        assert!((r.clamped.value - 0.35).abs() < 1e-6);

        // Small move passes untouched
        let r = v.validate(&fader_action(1, 0.58), &state);
        assert_eq!(r.clamped.value, 0.58);
        assert!(r.warning.is_empty());
    }

    #[test]
    fn test_fader_target_clamped_to_unit_range() {
        let state = state_with_fader(1, 0.95);
        let r = ActionValidator::new().validate(&fader_action(1, 7.0), &state);
        assert!(r.valid);
        assert!(r.clamped.value <= 1.0);
    }

    #[test]
    fn test_fader_invalid_channel_rejected() {
        let state = state_with_fader(1, 0.5);
        let r = ActionValidator::new().validate(&fader_action(42, 0.5), &state);
        assert!(!r.valid);
        assert!(r.warning.contains("Invalid channel"));
    }

    #[test]
    fn test_eq_boost_and_cut_clamps() {
        let state = state_with_fader(1, 0.5);
        let v = ActionValidator::new();

        let mut a = MixAction {
            kind: ActionKind::SetEqBand,
            channel: 3,
            band_index: 1,
            value: 1000.0,
            value2: 10.0,
            value3: 2.0,
            ..MixAction::default()
        };
        let r = v.validate(&a, &state);
        assert_eq!(r.clamped.value2, 3.0);
        assert!(r.warning.contains("boost clamped"));

        a.value2 = -20.0;
        let r = v.validate(&a, &state);
        assert_eq!(r.clamped.value2, -12.0);

        // Gains inside (-12, +3) pass through
        a.value2 = -6.0;
        let r = v.validate(&a, &state);
        assert_eq!(r.clamped.value2, -6.0);
        assert!(r.warning.is_empty());
    }

    #[test]
    fn test_eq_freq_and_q_clamps() {
        let state = state_with_fader(1, 0.5);
        let a = MixAction {
            kind: ActionKind::SetEqBand,
            channel: 1,
            value: 50_000.0,
            value2: 0.0,
            value3: 99.0,
            ..MixAction::default()
        };
        let r = ActionValidator::new().validate(&a, &state);
        assert_eq!(r.clamped.value, 20_000.0);
        assert_eq!(r.clamped.value3, 20.0);
    }

    #[test]
    fn test_comp_clamps() {
        let state = state_with_fader(1, 0.5);
        let a = MixAction {
            kind: ActionKind::SetCompressor,
            channel: 1,
            value: -80.0,
            value2: 50.0,
            ..MixAction::default()
        };
        let r = ActionValidator::new().validate(&a, &state);
        assert_eq!(r.clamped.value, -50.0);
        assert_eq!(r.clamped.value2, 20.0);
    }

    #[test]
    fn test_hpf_clamps() {
        let state = state_with_fader(1, 0.5);
        let a = MixAction {
            kind: ActionKind::SetHighPass,
            channel: 1,
            value: 900.0,
            ..MixAction::default()
        };
        let r = ActionValidator::new().validate(&a, &state);
        assert_eq!(r.clamped.value, 400.0);
        assert!(r.warning.contains("HPF clamped"));
    }

    #[test]
    fn test_send_clamps_level() {
        let state = state_with_fader(1, 0.5);
        let a = MixAction {
            kind: ActionKind::SetSendLevel,
            channel: 2,
            aux_index: 1,
            value: 1.8,
            ..MixAction::default()
        };
        let r = ActionValidator::new().validate(&a, &state);
        assert!(r.valid);
        assert_eq!(r.clamped.value, 1.0);
    }

    #[test]
    fn test_passthrough_kinds_always_valid() {
        let state = state_with_fader(1, 0.5);
        let v = ActionValidator::new();
        for kind in [
            ActionKind::MuteChannel,
            ActionKind::UnmuteChannel,
            ActionKind::NoAction,
            ActionKind::Observation,
        ] {
            let a = MixAction { kind, channel: 1, ..MixAction::default() };
            assert!(v.validate(&a, &state).valid);
        }
    }
}
