//! The console-adapter contract.
//!
//! Every console implementation (X32, Wing, Avantis, the simulator)
//! sits behind this trait. Upcalls from the adapter's receive thread
//! are delivered over a flume channel as [`AdapterEvent`]s; the agent
//! drains that channel on a dedicated thread, which preserves
//! per-channel receive order.

use super::params::{BusParam, ChannelParam, ConsoleCapabilities, ParamValue, ParameterUpdate};

/// Upcalls from the adapter to the core.
#[derive(Debug, Clone)]
pub enum AdapterEvent {
    /// A parameter changed on the console (or a sync reply arrived)
    Parameter(ParameterUpdate),
    /// Meter data for one channel: (1-based channel, rms dBFS, peak dBFS)
    Meter { channel: usize, rms_db: f32, peak_db: f32 },
    /// Connection came up / went down
    Connection(bool),
}

/// Outgoing half of the console contract.
///
/// Implementations own their socket and receive thread; `Send + Sync`
/// because writes come from the executor thread while `tick` runs on
/// the DSP thread.
pub trait ConsoleAdapter: Send + Sync {
    fn connect(&self, host: &str, port: u16) -> bool;
    fn disconnect(&self);
    fn is_connected(&self) -> bool;

    fn capabilities(&self) -> ConsoleCapabilities;

    /// Request a dump of every channel/bus parameter. Replies arrive as
    /// [`AdapterEvent::Parameter`] events.
    fn request_full_sync(&self);

    fn set_channel_param(&self, channel: usize, param: ChannelParam, value: ParamValue);
    fn set_send_level(&self, channel: usize, bus: usize, level: f32);
    fn set_bus_param(&self, bus: usize, param: BusParam, value: f32);

    fn subscribe_meter(&self, refresh_ms: u32);
    fn unsubscribe_meter(&self);

    /// Keepalive; called from the DSP loop every tick.
    fn tick(&self);

    /// The upcall channel. Cloning the receiver is cheap; events are
    /// broadcast to no one else.
    fn events(&self) -> flume::Receiver<AdapterEvent>;
}
