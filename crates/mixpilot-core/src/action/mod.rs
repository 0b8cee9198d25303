//! The action pipeline: typed mix actions, the safety validator and
//! the console executor.

pub mod executor;
pub mod schema;
pub mod validator;

pub use executor::{ActionExecutor, ExecutionResult};
pub use schema::{ActionKind, MixAction, Urgency};
pub use validator::{ActionValidator, SafetyLimits, ValidationResult};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::console::adapter::ConsoleAdapter;
    use crate::console::sim::SimConsole;
    use crate::console::state::ConsoleState;

    /// The full parse -> validate -> execute path for an over-eager
    /// LLM EQ boost: +10dB comes out as +3dB on the console.
    #[test]
    fn test_llm_boost_is_clamped_through_the_pipeline() {
        let sim = Arc::new(SimConsole::new(8, 4));
        let state = Arc::new(ConsoleState::new());
        state.init(8, 4);

        let action = MixAction::from_json(&serde_json::json!({
            "action": "set_eq", "channel": 3,
            "value": 1000, "value2": 10, "value3": 2, "band": 1
        }));
        assert_eq!(action.kind, ActionKind::SetEqBand);

        let validator = ActionValidator::new();
        let vr = validator.validate(&action, &state);
        assert!(vr.valid);
        assert_eq!(vr.clamped.value2, 3.0);
        assert!(vr.warning.contains("boost clamped"));

        let rx = sim.events();
        let executor = ActionExecutor::new(sim as Arc<dyn ConsoleAdapter>, state.clone());
        assert!(executor.execute(&vr.clamped).success);

        // Freq, gain, Q writes echoed back; apply them to the mirror
        let mut writes = 0;
        while let Ok(ev) = rx.try_recv() {
            if let crate::console::adapter::AdapterEvent::Parameter(u) = ev {
                state.apply_update(&u);
                writes += 1;
            }
        }
        assert_eq!(writes, 3);

        let ch = state.channel(3).unwrap();
        assert_eq!(ch.eq[0].freq, 1000.0);
        assert_eq!(ch.eq[0].gain, 3.0);
        assert_eq!(ch.eq[0].q, 2.0);
    }
}
