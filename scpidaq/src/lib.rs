//! Sample SCPI meters and scanners over serial ports.
//!
//! Instruments are opened with [`Instrument::open`] (or [`connect_all`] for a set of ports),
//! configured from a [`RunPlan`] and sampled by [`acquisition::run`].

pub mod acquisition;
pub mod config;
pub mod instrument;
pub mod sample;
pub mod sink;
pub mod transport;

#[cfg(test)]
mod testing;

pub use acquisition::{cancellation, run, Cancelled, Canceller, RunPlan, Setting};
pub use config::{RunConfig, Timing, TimingConfig};
pub use instrument::{connect_all, Instrument, InstrumentKind, Meter, MeterSetup, Scanner, ScannerSetup, Setup, State};
pub use sample::{Reading, Record, Sample, INVALID_SENTINEL};
pub use sink::{FileSink, NullSink, Sink};
pub use transport::serial::{list_usb_ports, SerialParams};
pub use transport::Transport;

pub use scpidaq_protocol::{
    ChannelList, ConfValue, Error, MeasurementMode, ProtocolError, RangeSetting, TransportError, TriggerSource,
};

pub type Result<T> = std::result::Result<T, Error>;
