//! Parameter identifiers and update payloads shared with console adapters.

use serde::{Deserialize, Serialize};

/// Every channel parameter the system can read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelParam {
    /// 0.0-1.0 normalized
    Fader,
    Mute,
    /// -1.0 (L) to +1.0 (R)
    Pan,
    Name,
    /// Preamp gain in dB
    Gain,
    /// 48V
    PhantomPower,
    PhaseInvert,
    // EQ
    EqOn,
    EqFreq(u8),
    EqGain(u8),
    EqQ(u8),
    EqType(u8),
    /// HPF corner frequency in Hz
    HighPassFreq,
    HighPassOn,
    // Dynamics
    CompThreshold,
    CompRatio,
    CompAttack,
    CompRelease,
    CompMakeup,
    CompOn,
    GateThreshold,
    GateRange,
    GateAttack,
    GateHold,
    GateRelease,
    GateOn,
    // Sends (require aux_index)
    SendLevel,
    SendPan,
    SendOn,
    // DCA assignment
    DcaAssign,
}

/// Bus/aux parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusParam {
    Fader,
    Mute,
    Pan,
    Name,
    EqOn,
    CompThreshold,
    CompRatio,
    CompOn,
}

/// Typed value carried by a parameter update.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Bool(bool),
    Int(i32),
    Str(String),
}

impl ParamValue {
    /// Float value, 0.0 when the variant doesn't carry one.
    pub fn as_float(&self) -> f32 {
        match self {
            ParamValue::Float(v) => *v,
            ParamValue::Int(v) => *v as f32,
            _ => 0.0,
        }
    }

    /// Bool value, false when the variant doesn't carry one.
    pub fn as_bool(&self) -> bool {
        matches!(self, ParamValue::Bool(true))
    }

    /// String value, empty when the variant doesn't carry one.
    pub fn as_str(&self) -> &str {
        match self {
            ParamValue::Str(s) => s.as_str(),
            _ => "",
        }
    }
}

/// What a parameter update addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTarget {
    Channel,
    Bus,
    Main,
    Dca,
}

/// One parameter change received from (or sent to) the console.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterUpdate {
    pub target: UpdateTarget,
    /// 1-based channel/bus number
    pub index: usize,
    /// For sends: which aux/bus (1-based)
    pub aux_index: usize,
    pub param: ChannelParam,
    pub value: ParamValue,
}

impl ParameterUpdate {
    pub fn channel_float(index: usize, param: ChannelParam, value: f32) -> Self {
        Self {
            target: UpdateTarget::Channel,
            index,
            aux_index: 0,
            param,
            value: ParamValue::Float(value),
        }
    }

    pub fn channel_bool(index: usize, param: ChannelParam, value: bool) -> Self {
        Self {
            target: UpdateTarget::Channel,
            index,
            aux_index: 0,
            param,
            value: ParamValue::Bool(value),
        }
    }

    pub fn channel_name(index: usize, name: impl Into<String>) -> Self {
        Self {
            target: UpdateTarget::Channel,
            index,
            aux_index: 0,
            param: ChannelParam::Name,
            value: ParamValue::Str(name.into()),
        }
    }
}

/// Capability descriptor reported by an adapter after connecting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleCapabilities {
    /// "X32", "Wing", "Avantis", "Sim"
    pub model: String,
    pub firmware: String,
    /// Input channels
    pub channel_count: usize,
    /// Aux/mix buses
    pub bus_count: usize,
    pub matrix_count: usize,
    pub dca_count: usize,
    pub fx_slots: usize,
    /// EQ bands per channel
    pub eq_bands: usize,
    pub has_motorized_faders: bool,
    pub has_dynamic_eq: bool,
    pub has_multiband_comp: bool,
    /// How often meters refresh, in ms
    pub meter_update_rate_ms: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_accessors() {
        assert_eq!(ParamValue::Float(0.5).as_float(), 0.5);
        assert_eq!(ParamValue::Int(3).as_float(), 3.0);
        assert_eq!(ParamValue::Bool(true).as_float(), 0.0);
        assert!(ParamValue::Bool(true).as_bool());
        assert!(!ParamValue::Float(1.0).as_bool());
        assert_eq!(ParamValue::Str("Kick".into()).as_str(), "Kick");
    }

    #[test]
    fn test_update_constructors() {
        let u = ParameterUpdate::channel_name(7, "Kick");
        assert_eq!(u.target, UpdateTarget::Channel);
        assert_eq!(u.index, 7);
        assert_eq!(u.param, ChannelParam::Name);
        assert_eq!(u.value.as_str(), "Kick");
    }
}
