//! Thread-safe mirror of the console's channel and bus state.
//!
//! Single source of truth: updated by the adapter event pump, queried
//! by the DSP, LLM and executor threads. Readers never block readers;
//! snapshots are returned by value so no lock is held across analysis.

use std::sync::RwLock;

use crate::types::DB_FLOOR;

use super::params::{ChannelParam, ParameterUpdate, UpdateTarget};

/// Number of EQ bands mirrored per channel
pub const EQ_BANDS: usize = 6;

/// One parametric EQ band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqBandState {
    pub freq: f32,
    pub gain: f32,
    pub q: f32,
    /// 0=bell, 1=shelf, 2=hpf, 3=lpf
    pub band_type: u8,
}

impl Default for EqBandState {
    fn default() -> Self {
        Self { freq: 1000.0, gain: 0.0, q: 1.0, band_type: 0 }
    }
}

/// Compressor section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorState {
    pub threshold: f32,
    pub ratio: f32,
    pub attack: f32,
    pub release: f32,
    pub makeup: f32,
    pub on: bool,
}

impl Default for CompressorState {
    fn default() -> Self {
        Self { threshold: 0.0, ratio: 1.0, attack: 10.0, release: 100.0, makeup: 0.0, on: false }
    }
}

/// Gate section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateState {
    pub threshold: f32,
    pub range: f32,
    pub attack: f32,
    pub hold: f32,
    pub release: f32,
    pub on: bool,
}

impl Default for GateState {
    fn default() -> Self {
        Self { threshold: -80.0, range: -80.0, attack: 0.5, hold: 50.0, release: 200.0, on: false }
    }
}

/// Spectral slice pushed by the DSP thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralData {
    pub bass: f32,
    pub mid: f32,
    pub presence: f32,
    pub crest_factor: f32,
    pub spectral_centroid: f32,
}

impl Default for SpectralData {
    fn default() -> Self {
        Self {
            bass: DB_FLOOR,
            mid: DB_FLOOR,
            presence: DB_FLOOR,
            crest_factor: 0.0,
            spectral_centroid: 0.0,
        }
    }
}

/// Snapshot of one input channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    /// 1-based channel number
    pub index: usize,
    pub name: String,
    /// 0.0-1.0 normalized
    pub fader: f32,
    pub muted: bool,
    /// -1.0 (L) to +1.0 (R)
    pub pan: f32,
    pub gain_db: f32,
    pub phantom: bool,
    pub phase: bool,

    pub eq_on: bool,
    pub eq: [EqBandState; EQ_BANDS],
    pub hpf_freq: f32,
    pub hpf_on: bool,

    pub comp: CompressorState,
    pub gate: GateState,

    // Metering (updated by the meter subscription)
    pub rms_db: f32,
    pub peak_db: f32,

    // Spectral data (updated by the DSP thread)
    pub spectral: SpectralData,

    /// Send levels to buses, indexed 0-based internally (bus 1 = sends[0])
    pub sends: Vec<f32>,
}

impl ChannelSnapshot {
    fn new(index: usize, bus_count: usize) -> Self {
        Self {
            index,
            name: String::new(),
            fader: 0.75,
            muted: false,
            pan: 0.0,
            gain_db: 0.0,
            phantom: false,
            phase: false,
            eq_on: true,
            eq: [EqBandState::default(); EQ_BANDS],
            hpf_freq: 0.0,
            hpf_on: false,
            comp: CompressorState::default(),
            gate: GateState::default(),
            rms_db: DB_FLOOR,
            peak_db: DB_FLOOR,
            spectral: SpectralData::default(),
            sends: vec![0.0; bus_count],
        }
    }
}

/// Snapshot of one mix bus.
#[derive(Debug, Clone, PartialEq)]
pub struct BusSnapshot {
    pub index: usize,
    pub name: String,
    pub fader: f32,
    pub muted: bool,
    pub pan: f32,
}

impl BusSnapshot {
    fn new(index: usize) -> Self {
        Self { index, name: String::new(), fader: 0.75, muted: false, pan: 0.0 }
    }
}

/// The state mirror. All indices are 1-based; out-of-range updates are
/// silently dropped because protocol layers can emit spurious updates
/// during reconnect.
#[derive(Default)]
pub struct ConsoleState {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    channels: Vec<ChannelSnapshot>,
    buses: Vec<BusSnapshot>,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the mirror once at connection time.
    pub fn init(&self, channel_count: usize, bus_count: usize) {
        let mut inner = self.inner.write().unwrap();
        inner.channels = (1..=channel_count)
            .map(|i| ChannelSnapshot::new(i, bus_count))
            .collect();
        inner.buses = (1..=bus_count).map(BusSnapshot::new).collect();
    }

    /// Copy of a channel's state; `None` when out of range.
    pub fn channel(&self, ch: usize) -> Option<ChannelSnapshot> {
        let inner = self.inner.read().unwrap();
        inner.channels.get(ch.wrapping_sub(1)).cloned()
    }

    /// Copy of a bus's state; `None` when out of range.
    pub fn bus(&self, bus: usize) -> Option<BusSnapshot> {
        let inner = self.inner.read().unwrap();
        inner.buses.get(bus.wrapping_sub(1)).cloned()
    }

    pub fn channel_count(&self) -> usize {
        self.inner.read().unwrap().channels.len()
    }

    pub fn bus_count(&self) -> usize {
        self.inner.read().unwrap().buses.len()
    }

    /// Apply an incoming update from the console adapter.
    pub fn apply_update(&self, u: &ParameterUpdate) {
        let mut inner = self.inner.write().unwrap();
        match u.target {
            UpdateTarget::Channel => {
                let Some(ch) = inner.channels.get_mut(u.index.wrapping_sub(1)) else {
                    return;
                };
                apply_channel_param(ch, u);
            }
            UpdateTarget::Bus => {
                let Some(bus) = inner.buses.get_mut(u.index.wrapping_sub(1)) else {
                    return;
                };
                match u.param {
                    ChannelParam::Fader => bus.fader = u.value.as_float(),
                    ChannelParam::Mute => bus.muted = u.value.as_bool(),
                    ChannelParam::Pan => bus.pan = u.value.as_float(),
                    ChannelParam::Name => bus.name = u.value.as_str().to_string(),
                    _ => {}
                }
            }
            // Main/DCA state is not mirrored yet
            UpdateTarget::Main | UpdateTarget::Dca => {}
        }
    }

    /// Update meter values from the metering callback.
    pub fn update_meter(&self, ch: usize, rms_db: f32, peak_db: f32) {
        let mut inner = self.inner.write().unwrap();
        if let Some(snap) = inner.channels.get_mut(ch.wrapping_sub(1)) {
            snap.rms_db = rms_db;
            snap.peak_db = peak_db;
        }
    }

    /// Update spectral data from the DSP analysis thread.
    pub fn update_spectral(&self, ch: usize, data: SpectralData) {
        let mut inner = self.inner.write().unwrap();
        if let Some(snap) = inner.channels.get_mut(ch.wrapping_sub(1)) {
            snap.spectral = data;
        }
    }

    /// Snapshot every channel (for LLM context building).
    pub fn all_channels(&self) -> Vec<ChannelSnapshot> {
        self.inner.read().unwrap().channels.clone()
    }
}

fn apply_channel_param(ch: &mut ChannelSnapshot, u: &ParameterUpdate) {
    match u.param {
        ChannelParam::Fader => ch.fader = u.value.as_float(),
        ChannelParam::Mute => ch.muted = u.value.as_bool(),
        ChannelParam::Pan => ch.pan = u.value.as_float(),
        ChannelParam::Name => ch.name = u.value.as_str().to_string(),
        ChannelParam::Gain => ch.gain_db = u.value.as_float(),
        ChannelParam::PhantomPower => ch.phantom = u.value.as_bool(),
        ChannelParam::PhaseInvert => ch.phase = u.value.as_bool(),
        ChannelParam::EqOn => ch.eq_on = u.value.as_bool(),
        ChannelParam::HighPassFreq => ch.hpf_freq = u.value.as_float(),
        ChannelParam::HighPassOn => ch.hpf_on = u.value.as_bool(),
        ChannelParam::EqFreq(b) => {
            if let Some(band) = ch.eq.get_mut(usize::from(b).wrapping_sub(1)) {
                band.freq = u.value.as_float();
            }
        }
        ChannelParam::EqGain(b) => {
            if let Some(band) = ch.eq.get_mut(usize::from(b).wrapping_sub(1)) {
                band.gain = u.value.as_float();
            }
        }
        ChannelParam::EqQ(b) => {
            if let Some(band) = ch.eq.get_mut(usize::from(b).wrapping_sub(1)) {
                band.q = u.value.as_float();
            }
        }
        ChannelParam::EqType(b) => {
            if let Some(band) = ch.eq.get_mut(usize::from(b).wrapping_sub(1)) {
                band.band_type = u.value.as_float() as u8;
            }
        }
        ChannelParam::CompThreshold => ch.comp.threshold = u.value.as_float(),
        ChannelParam::CompRatio => ch.comp.ratio = u.value.as_float(),
        ChannelParam::CompAttack => ch.comp.attack = u.value.as_float(),
        ChannelParam::CompRelease => ch.comp.release = u.value.as_float(),
        ChannelParam::CompMakeup => ch.comp.makeup = u.value.as_float(),
        ChannelParam::CompOn => ch.comp.on = u.value.as_bool(),
        ChannelParam::GateThreshold => ch.gate.threshold = u.value.as_float(),
        ChannelParam::GateRange => ch.gate.range = u.value.as_float(),
        ChannelParam::GateAttack => ch.gate.attack = u.value.as_float(),
        ChannelParam::GateHold => ch.gate.hold = u.value.as_float(),
        ChannelParam::GateRelease => ch.gate.release = u.value.as_float(),
        ChannelParam::GateOn => ch.gate.on = u.value.as_bool(),
        ChannelParam::SendLevel => {
            if u.aux_index >= 1 && u.aux_index <= ch.sends.len() {
                ch.sends[u.aux_index - 1] = u.value.as_float();
            }
        }
        ChannelParam::SendPan | ChannelParam::SendOn | ChannelParam::DcaAssign => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::params::ParamValue;

    fn state() -> ConsoleState {
        let s = ConsoleState::new();
        s.init(8, 4);
        s
    }

    #[test]
    fn test_init_sizes() {
        let s = state();
        assert_eq!(s.channel_count(), 8);
        assert_eq!(s.bus_count(), 4);
        assert_eq!(s.channel(1).unwrap().sends.len(), 4);
        assert_eq!(s.channel(8).unwrap().index, 8);
        assert!(s.channel(9).is_none());
        assert!(s.channel(0).is_none());
    }

    #[test]
    fn test_apply_update_changes_only_target_field() {
        let s = state();
        let before = s.channel(3).unwrap();

        s.apply_update(&ParameterUpdate::channel_float(3, ChannelParam::Fader, 0.42));

        let after = s.channel(3).unwrap();
        assert_eq!(after.fader, 0.42);
        assert_eq!(after.name, before.name);
        assert_eq!(after.muted, before.muted);
        assert_eq!(after.eq, before.eq);
        assert_eq!(after.comp, before.comp);

        // Other channels untouched
        assert_eq!(s.channel(2).unwrap(), {
            let mut c = before.clone();
            c.index = 2;
            c
        });
    }

    #[test]
    fn test_out_of_range_update_is_noop() {
        let s = state();
        s.apply_update(&ParameterUpdate::channel_float(99, ChannelParam::Fader, 0.1));
        s.apply_update(&ParameterUpdate::channel_float(0, ChannelParam::Fader, 0.1));
        s.update_meter(99, 0.0, 0.0);
        for ch in 1..=8 {
            assert_eq!(s.channel(ch).unwrap().fader, 0.75);
        }
    }

    #[test]
    fn test_send_update_requires_valid_aux() {
        let s = state();
        let mut u = ParameterUpdate::channel_float(1, ChannelParam::SendLevel, 0.6);
        u.aux_index = 2;
        s.apply_update(&u);
        assert_eq!(s.channel(1).unwrap().sends, vec![0.0, 0.6, 0.0, 0.0]);

        u.aux_index = 5; // out of range, dropped
        s.apply_update(&u);
        assert_eq!(s.channel(1).unwrap().sends, vec![0.0, 0.6, 0.0, 0.0]);
    }

    #[test]
    fn test_eq_band_updates() {
        let s = state();
        s.apply_update(&ParameterUpdate::channel_float(2, ChannelParam::EqFreq(1), 250.0));
        s.apply_update(&ParameterUpdate::channel_float(2, ChannelParam::EqGain(1), -4.0));
        s.apply_update(&ParameterUpdate::channel_float(2, ChannelParam::EqQ(1), 2.5));
        let ch = s.channel(2).unwrap();
        assert_eq!(ch.eq[0].freq, 250.0);
        assert_eq!(ch.eq[0].gain, -4.0);
        assert_eq!(ch.eq[0].q, 2.5);
        // Band index 0 or 7 would be dropped
        s.apply_update(&ParameterUpdate::channel_float(2, ChannelParam::EqGain(0), 9.0));
        s.apply_update(&ParameterUpdate::channel_float(2, ChannelParam::EqGain(7), 9.0));
        assert_eq!(s.channel(2).unwrap().eq[0].gain, -4.0);
    }

    #[test]
    fn test_meter_and_spectral_updates() {
        let s = state();
        s.update_meter(4, -12.5, -3.0);
        let ch = s.channel(4).unwrap();
        assert_eq!(ch.rms_db, -12.5);
        assert_eq!(ch.peak_db, -3.0);

        s.update_spectral(
            4,
            SpectralData { bass: -10.0, mid: -15.0, presence: -20.0, crest_factor: 8.0, spectral_centroid: 800.0 },
        );
        assert_eq!(s.channel(4).unwrap().spectral.bass, -10.0);
    }

    #[test]
    fn test_bus_updates() {
        let s = state();
        let mut u = ParameterUpdate::channel_float(2, ChannelParam::Fader, 0.33);
        u.target = UpdateTarget::Bus;
        s.apply_update(&u);
        assert_eq!(s.bus(2).unwrap().fader, 0.33);

        let mut name = ParameterUpdate {
            target: UpdateTarget::Bus,
            index: 1,
            aux_index: 0,
            param: ChannelParam::Name,
            value: ParamValue::Str("Monitors".into()),
        };
        s.apply_update(&name);
        assert_eq!(s.bus(1).unwrap().name, "Monitors");
        name.index = 9;
        s.apply_update(&name); // dropped
    }
}
