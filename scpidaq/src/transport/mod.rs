//! Line based transport to a single SCPI instrument.
//!
//! The transport owns the underlying stream. Dropping it (or calling [`Transport::close`])
//! releases the port.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::time::{self, sleep};
use tokio_serial::SerialStream;

use crate::config::Timing;
use crate::Error;
use scpidaq_protocol::response::{COMMAND_TERMINATOR, RESPONSE_TERMINATOR};
use scpidaq_protocol::scpi;
use serial::SerialParams;

pub mod serial;

struct ReadPending<'a, T: AsyncRead + Unpin> {
    inner: &'a mut T,
}

impl<'a, T: AsyncRead + Unpin> Future for ReadPending<'a, T> {
    type Output = io::Result<Vec<u8>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut ret = Vec::new();
        loop {
            let mut buf_data = [0_u8; 256];
            let mut buf = ReadBuf::new(&mut buf_data);
            match Pin::new(&mut self.inner).poll_read(cx, &mut buf) {
                Poll::Ready(Ok(())) => {
                    if buf.filled().is_empty() {
                        // end of stream
                        return Poll::Ready(Ok(ret));
                    }
                    ret.extend_from_slice(buf.filled());
                }
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending => return Poll::Ready(Ok(ret)),
            }
        }
    }
}

/// Read whatever is already buffered without waiting for more.
async fn read_pending<T: AsyncRead + Unpin>(stream: &mut T) -> io::Result<Vec<u8>> {
    ReadPending { inner: stream }.await
}

async fn read_to_term<T: AsyncRead + Unpin>(stream: &mut T, term: u8) -> crate::Result<Vec<u8>> {
    let mut ret = Vec::new();
    loop {
        let x = stream.read_u8().await.map_err(Error::transport)?;
        if x == term {
            break;
        }
        ret.push(x);
    }
    Ok(ret)
}

pub struct Transport<T> {
    name: String,
    stream: Option<T>,
    read_timeout: Option<Duration>,
    read_settle: Duration,
}

impl Transport<SerialStream> {
    /// Open the serial port at `path` and put the instrument into remote mode.
    pub async fn open(path: &str, params: &SerialParams, timing: &Timing) -> crate::Result<Self> {
        let stream = serial::open_serial_port(path, params)?;
        Self::connect(path, stream, timing).await
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport<T> {
    /// Take ownership of an already opened stream, let it settle and send the remote
    /// handshake.
    pub async fn connect(name: &str, stream: T, timing: &Timing) -> crate::Result<Self> {
        let mut ret = Transport {
            name: name.to_string(),
            stream: Some(stream),
            read_timeout: timing.read_timeout,
            read_settle: timing.read_settle,
        };
        sleep(timing.port_settle).await;
        ret.send(scpi::REMOTE).await?;
        log::info!("Connected to {}", ret.name);
        Ok(ret)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&mut self) -> crate::Result<&mut T> {
        self.stream.as_mut().ok_or(Error::NotConnected)
    }

    /// Release the port. Calling this more than once is fine.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Closed {}", self.name);
        }
    }

    pub async fn send(&mut self, line: &str) -> crate::Result<()> {
        let mut msg = line.as_bytes().to_vec();
        if msg.last() != Some(&COMMAND_TERMINATOR) {
            msg.push(COMMAND_TERMINATOR);
        }
        let stream = self.stream()?;
        stream.write_all(&msg).await.map_err(Error::transport)?;
        stream.flush().await.map_err(Error::transport)?;
        log::debug!("[{}] write: {}", self.name, line.trim_end());
        Ok(())
    }

    /// Read one response line. The returned text excludes the final `\n`.
    pub async fn recv_line(&mut self) -> crate::Result<String> {
        let timeout = self.read_timeout;
        let stream = self.stream()?;
        let fut = read_to_term(stream, RESPONSE_TERMINATOR);
        let data = match timeout {
            Some(timeout) => match time::timeout(timeout, fut).await {
                Ok(x) => x?,
                Err(_) => {
                    log::debug!("[{}] read timeout", self.name);
                    return Err(Error::protocol_timeout());
                }
            },
            None => fut.await?,
        };
        let ret = String::from_utf8_lossy(&data).into_owned();
        log::debug!("[{}] read: {:?}", self.name, ret);
        Ok(ret)
    }

    /// Throw away stale input, e.g. a late reply to an earlier query.
    pub async fn drain(&mut self) -> crate::Result<()> {
        let stream = self.stream()?;
        let stale = read_pending(stream).await.map_err(Error::transport)?;
        if !stale.is_empty() {
            log::debug!("[{}] discarding {:?}", self.name, String::from_utf8_lossy(&stale));
        }
        Ok(())
    }

    pub async fn query(&mut self, line: &str) -> crate::Result<String> {
        self.drain().await?;
        self.send(line).await?;
        sleep(self.read_settle).await;
        self.recv_line().await
    }
}

impl<T> Drop for Transport<T> {
    fn drop(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("Releasing {}", self.name);
        }
    }
}
