//! Meters and scanners.
//!
//! Both kinds share the same life cycle: `Opened -> Configured -> Reading -> Closed`. An
//! instrument may be reconfigured at any point before it is closed. Once closed, every
//! operation fails with [`Error::NotConnected`].

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep;
use tokio_serial::SerialStream;

use crate::acquisition::Setting;
use crate::config::Timing;
use crate::sample::Sample;
use crate::transport::serial::SerialParams;
use crate::transport::Transport;
use crate::Error;
use scpidaq_protocol::response::strip_terminator;
use scpidaq_protocol::{scpi, ChannelList, ConfValue, ProtocolError, RangeSetting, TriggerSource};

pub use meter::Meter;
pub use scanner::Scanner;

mod meter;
mod scanner;

#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Meter,
    Scanner,
}

impl Display for InstrumentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKind::Meter => f.write_str("meter"),
            InstrumentKind::Scanner => f.write_str("scanner"),
        }
    }
}

impl FromStr for InstrumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "meter" => Ok(InstrumentKind::Meter),
            "scanner" => Ok(InstrumentKind::Scanner),
            _ => Err(Error::argument(anyhow!("Unknown instrument kind `{}`", s))),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum State {
    Opened,
    Configured,
    Reading,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeterSetup {
    pub mode: String,
    pub range: ConfValue,
    pub resolution: ConfValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScannerSetup {
    pub mode: String,
    pub range: RangeSetting,
    pub resolution: ConfValue,
    pub channels: ChannelList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Setup {
    Meter(MeterSetup),
    Scanner(ScannerSetup),
}

impl Setup {
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Setup::Meter(_) => InstrumentKind::Meter,
            Setup::Scanner(_) => InstrumentKind::Scanner,
        }
    }
}

/// State shared by both instrument kinds.
pub(crate) struct Link<T> {
    transport: Transport<T>,
    timing: Timing,
    state: State,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Link<T> {
    fn new(transport: Transport<T>, timing: Timing) -> Self {
        Link {
            transport,
            timing,
            state: State::Opened,
        }
    }

    fn name(&self) -> &str {
        self.transport.name()
    }

    fn ensure_open(&self) -> crate::Result<()> {
        if self.state == State::Closed || !self.transport.is_open() {
            Err(Error::NotConnected)
        } else {
            Ok(())
        }
    }

    /// Send configuration commands, pausing between two consecutive ones.
    async fn send_commands(&mut self, commands: &[String]) -> crate::Result<()> {
        for (idx, cmd) in commands.iter().enumerate() {
            if idx > 0 {
                sleep(self.timing.command_settle).await;
            }
            self.transport.send(cmd).await?;
        }
        Ok(())
    }

    /// Query a reading and parse it.
    ///
    /// If the reply cannot be parsed, one more line is read without re-sending the query, as
    /// the instrument sometimes emits a diagnostic line before the value. If that fails too,
    /// the most recent raw text is returned as `Ok(Err(raw))`. A timeout on the first line
    /// is returned as error.
    async fn read_reply<R, F>(&mut self, parse: F) -> crate::Result<Result<R, String>>
    where
        F: Fn(&str) -> Result<R, ProtocolError>,
    {
        let raw = self.transport.query(scpi::READ).await?;
        if let Ok(x) = parse(&raw) {
            return Ok(Ok(x));
        }
        let raw = strip_terminator(&raw).to_string();
        log::warn!("[{}] Unexpected reply {:?}, reading once more", self.name(), raw);
        match self.transport.recv_line().await {
            Ok(retry) => match parse(&retry) {
                Ok(x) => Ok(Ok(x)),
                Err(_) => {
                    let retry = strip_terminator(&retry).to_string();
                    log::warn!("[{}] Unexpected reply {:?}, giving up", self.name(), retry);
                    Ok(Err(retry))
                }
            },
            Err(Error::Protocol(ProtocolError::Timeout)) => {
                log::warn!("[{}] No second reply, giving up", self.name());
                Ok(Err(raw))
            }
            Err(err) => Err(err),
        }
    }

    async fn identify(&mut self) -> crate::Result<String> {
        self.ensure_open()?;
        let raw = self.transport.query(scpi::IDENTIFY).await?;
        Ok(strip_terminator(&raw).to_string())
    }

    async fn set_trigger(&mut self, source: TriggerSource) -> crate::Result<()> {
        self.ensure_open()?;
        self.transport.send(&source.command()).await
    }

    fn close(&mut self) {
        self.transport.close();
        self.state = State::Closed;
    }
}

pub enum Instrument<T = SerialStream> {
    Meter(Meter<T>),
    Scanner(Scanner<T>),
}

impl Instrument<SerialStream> {
    /// Open an instrument on a serial port address such as `/dev/ttyUSB0` or `COM3::9600::8N2`.
    pub async fn open(kind: InstrumentKind, addr: &str, params: &SerialParams, timing: &Timing) -> crate::Result<Self> {
        let (path, params) = SerialParams::from_address(addr, params)?;
        let transport = Transport::open(&path, &params, timing).await?;
        Ok(Self::from_transport(kind, transport, timing))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Instrument<T> {
    pub async fn connect(kind: InstrumentKind, name: &str, stream: T, timing: &Timing) -> crate::Result<Self> {
        let transport = Transport::connect(name, stream, timing).await?;
        Ok(Self::from_transport(kind, transport, timing))
    }

    fn from_transport(kind: InstrumentKind, transport: Transport<T>, timing: &Timing) -> Self {
        let link = Link::new(transport, timing.clone());
        match kind {
            InstrumentKind::Meter => Instrument::Meter(Meter::new(link)),
            InstrumentKind::Scanner => Instrument::Scanner(Scanner::new(link)),
        }
    }

    fn link(&self) -> &Link<T> {
        match self {
            Instrument::Meter(x) => &x.link,
            Instrument::Scanner(x) => &x.link,
        }
    }

    fn link_mut(&mut self) -> &mut Link<T> {
        match self {
            Instrument::Meter(x) => &mut x.link,
            Instrument::Scanner(x) => &mut x.link,
        }
    }

    pub fn kind(&self) -> InstrumentKind {
        match self {
            Instrument::Meter(_) => InstrumentKind::Meter,
            Instrument::Scanner(_) => InstrumentKind::Scanner,
        }
    }

    pub fn name(&self) -> &str {
        self.link().name()
    }

    pub fn state(&self) -> State {
        self.link().state
    }

    /// Number of values produced by one [`Instrument::read`].
    pub fn width(&self) -> usize {
        match self {
            Instrument::Meter(_) => 1,
            Instrument::Scanner(x) => x.width(),
        }
    }

    pub async fn configure(&mut self, setup: &Setup) -> crate::Result<()> {
        self.link().ensure_open()?;
        match (self, setup) {
            (Instrument::Meter(meter), Setup::Meter(setup)) => meter.configure(setup).await,
            (Instrument::Scanner(scanner), Setup::Scanner(setup)) => scanner.configure(setup).await,
            (instrument, setup) => Err(Error::argument(anyhow!(
                "Cannot apply a {} setup to the {} on {}",
                setup.kind(),
                instrument.kind(),
                instrument.name()
            ))),
        }
    }

    pub async fn read(&mut self) -> crate::Result<Sample> {
        self.link().ensure_open()?;
        match self {
            Instrument::Meter(x) => x.read().await.map(Sample::Scalar),
            Instrument::Scanner(x) => x.read().await.map(Sample::Vector),
        }
    }

    /// Query the `*IDN?` string.
    pub async fn identify(&mut self) -> crate::Result<String> {
        self.link_mut().identify().await
    }

    pub async fn set_trigger(&mut self, source: TriggerSource) -> crate::Result<()> {
        self.link_mut().set_trigger(source).await
    }

    pub fn close(&mut self) {
        self.link_mut().close()
    }
}

/// Open one instrument per port, assigning kinds positionally.
pub async fn connect_all(
    ports: &[String],
    kinds: &Setting<InstrumentKind>,
    params: &SerialParams,
    timing: &Timing,
) -> crate::Result<Vec<Instrument>> {
    let kinds = kinds.resolve(ports.len(), "kinds")?;
    let mut ret = Vec::with_capacity(ports.len());
    for (port, kind) in ports.iter().zip(kinds) {
        log::info!("Opening {} on {}", kind, port);
        ret.push(Instrument::open(kind, port, params, timing).await?);
    }
    Ok(ret)
}
