//! In-memory console simulator.
//!
//! Behaves like a console that immediately confirms every write: each
//! `set_*` call stores the value and echoes it back as a parameter
//! event, and `request_full_sync` replays the whole surface. Used by
//! the test suite and by the `sim` console type so the agent can run
//! without hardware.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use super::adapter::{AdapterEvent, ConsoleAdapter};
use super::params::{
    BusParam, ChannelParam, ConsoleCapabilities, ParamValue, ParameterUpdate, UpdateTarget,
};

struct SimChannel {
    name: String,
    fader: f32,
    muted: bool,
    pan: f32,
    sends: Vec<f32>,
}

pub struct SimConsole {
    caps: ConsoleCapabilities,
    connected: AtomicBool,
    meter_subscribed: AtomicBool,
    ticks: AtomicU32,
    channels: Mutex<Vec<SimChannel>>,
    bus_names: Mutex<Vec<String>>,
    tx: flume::Sender<AdapterEvent>,
    rx: flume::Receiver<AdapterEvent>,
}

impl SimConsole {
    pub fn new(channel_count: usize, bus_count: usize) -> Self {
        let (tx, rx) = flume::unbounded();
        let channels = (0..channel_count)
            .map(|_| SimChannel {
                name: String::new(),
                fader: 0.75,
                muted: false,
                pan: 0.0,
                sends: vec![0.0; bus_count],
            })
            .collect();
        Self {
            caps: ConsoleCapabilities {
                model: "Sim".into(),
                firmware: "1.0".into(),
                channel_count,
                bus_count,
                matrix_count: 0,
                dca_count: 8,
                fx_slots: 4,
                eq_bands: 6,
                has_motorized_faders: true,
                has_dynamic_eq: false,
                has_multiband_comp: false,
                meter_update_rate_ms: 50,
            },
            connected: AtomicBool::new(false),
            meter_subscribed: AtomicBool::new(false),
            ticks: AtomicU32::new(0),
            channels: Mutex::new(channels),
            bus_names: Mutex::new(vec![String::new(); bus_count]),
            tx,
            rx,
        }
    }

    /// Seed channel names before a sync (test scaffolding for shows).
    pub fn set_names(&self, names: &[(usize, &str)]) {
        let mut channels = self.channels.lock().unwrap();
        for &(ch, name) in names {
            if let Some(c) = channels.get_mut(ch - 1) {
                c.name = name.to_string();
            }
        }
    }

    /// Inject a meter reading, as the console's meter stream would.
    pub fn push_meter(&self, channel: usize, rms_db: f32, peak_db: f32) {
        let _ = self.tx.send(AdapterEvent::Meter { channel, rms_db, peak_db });
    }

    /// Inject an arbitrary update, as the console surface would emit it.
    pub fn push_update(&self, update: ParameterUpdate) {
        let _ = self.tx.send(AdapterEvent::Parameter(update));
    }

    pub fn tick_count(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn meter_subscribed(&self) -> bool {
        self.meter_subscribed.load(Ordering::Relaxed)
    }

    /// Current simulated fader for assertions.
    pub fn fader(&self, ch: usize) -> f32 {
        self.channels.lock().unwrap()[ch - 1].fader
    }

    fn echo(&self, update: ParameterUpdate) {
        let _ = self.tx.send(AdapterEvent::Parameter(update));
    }
}

impl ConsoleAdapter for SimConsole {
    fn connect(&self, host: &str, port: u16) -> bool {
        log::info!("SimConsole: connected to {}:{} (virtual)", host, port);
        self.connected.store(true, Ordering::Release);
        let _ = self.tx.send(AdapterEvent::Connection(true));
        true
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        let _ = self.tx.send(AdapterEvent::Connection(false));
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn capabilities(&self) -> ConsoleCapabilities {
        self.caps.clone()
    }

    fn request_full_sync(&self) {
        let channels = self.channels.lock().unwrap();
        for (i, ch) in channels.iter().enumerate() {
            let index = i + 1;
            self.echo(ParameterUpdate::channel_float(index, ChannelParam::Fader, ch.fader));
            self.echo(ParameterUpdate::channel_bool(index, ChannelParam::Mute, ch.muted));
            self.echo(ParameterUpdate::channel_float(index, ChannelParam::Pan, ch.pan));
            for (bus, &level) in ch.sends.iter().enumerate() {
                self.echo(ParameterUpdate {
                    target: UpdateTarget::Channel,
                    index,
                    aux_index: bus + 1,
                    param: ChannelParam::SendLevel,
                    value: ParamValue::Float(level),
                });
            }
            // Name last: sync progress is counted on Name updates
            self.echo(ParameterUpdate::channel_name(index, ch.name.clone()));
        }
        let bus_names = self.bus_names.lock().unwrap();
        for (i, name) in bus_names.iter().enumerate() {
            self.echo(ParameterUpdate {
                target: UpdateTarget::Bus,
                index: i + 1,
                aux_index: 0,
                param: ChannelParam::Name,
                value: ParamValue::Str(name.clone()),
            });
        }
    }

    fn set_channel_param(&self, channel: usize, param: ChannelParam, value: ParamValue) {
        {
            let mut channels = self.channels.lock().unwrap();
            let Some(ch) = channels.get_mut(channel.wrapping_sub(1)) else {
                return;
            };
            match param {
                ChannelParam::Fader => ch.fader = value.as_float(),
                ChannelParam::Mute => ch.muted = value.as_bool(),
                ChannelParam::Pan => ch.pan = value.as_float(),
                ChannelParam::Name => ch.name = value.as_str().to_string(),
                _ => {}
            }
        }
        self.echo(ParameterUpdate {
            target: UpdateTarget::Channel,
            index: channel,
            aux_index: 0,
            param,
            value,
        });
    }

    fn set_send_level(&self, channel: usize, bus: usize, level: f32) {
        {
            let mut channels = self.channels.lock().unwrap();
            let Some(ch) = channels.get_mut(channel.wrapping_sub(1)) else {
                return;
            };
            if bus >= 1 && bus <= ch.sends.len() {
                ch.sends[bus - 1] = level;
            }
        }
        self.echo(ParameterUpdate {
            target: UpdateTarget::Channel,
            index: channel,
            aux_index: bus,
            param: ChannelParam::SendLevel,
            value: ParamValue::Float(level),
        });
    }

    fn set_bus_param(&self, bus: usize, param: BusParam, value: f32) {
        let channel_param = match param {
            BusParam::Fader => ChannelParam::Fader,
            BusParam::Mute => ChannelParam::Mute,
            BusParam::Pan => ChannelParam::Pan,
            _ => return,
        };
        self.echo(ParameterUpdate {
            target: UpdateTarget::Bus,
            index: bus,
            aux_index: 0,
            param: channel_param,
            value: ParamValue::Float(value),
        });
    }

    fn subscribe_meter(&self, refresh_ms: u32) {
        log::debug!("SimConsole: meter subscription at {}ms", refresh_ms);
        self.meter_subscribed.store(true, Ordering::Relaxed);
    }

    fn unsubscribe_meter(&self) {
        self.meter_subscribed.store(false, Ordering::Relaxed);
    }

    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn events(&self) -> flume::Receiver<AdapterEvent> {
        self.rx.clone()
    }
}
