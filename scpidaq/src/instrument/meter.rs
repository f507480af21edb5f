use tokio::io::{AsyncRead, AsyncWrite};

use super::{Link, MeterSetup, State};
use crate::sample::Reading;
use crate::Error;
use scpidaq_protocol::{encode, parse_scalar, ConfigParams, ProtocolError};

/// A single channel digital multimeter such as the 34401A.
pub struct Meter<T> {
    pub(super) link: Link<T>,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Meter<T> {
    pub(super) fn new(link: Link<T>) -> Self {
        Meter { link }
    }

    pub async fn configure(&mut self, setup: &MeterSetup) -> crate::Result<()> {
        self.link.ensure_open()?;
        let params = ConfigParams {
            range: setup.range,
            resolution: setup.resolution,
            channels: None,
        };
        match encode(&setup.mode, &params) {
            Some(cmd) => self.link.send_commands(&[cmd]).await?,
            None => log::warn!(
                "[{}] Unknown measurement mode `{}`, configuration skipped",
                self.link.name(),
                setup.mode
            ),
        }
        self.link.state = State::Configured;
        Ok(())
    }

    /// Take one measurement. Replies which aren't numbers degrade to [`Reading::Invalid`],
    /// a missing reply to [`Reading::Timeout`].
    pub async fn read(&mut self) -> crate::Result<Reading> {
        self.link.ensure_open()?;
        self.link.state = State::Reading;
        match self.link.read_reply(parse_scalar).await {
            Ok(Ok(x)) => Ok(Reading::Value(x)),
            Ok(Err(raw)) => Ok(Reading::Invalid(raw)),
            Err(Error::Protocol(ProtocolError::Timeout)) => {
                log::warn!("[{}] Timeout while waiting for a reading", self.link.name());
                Ok(Reading::Timeout)
            }
            Err(err) => Err(err),
        }
    }
}
