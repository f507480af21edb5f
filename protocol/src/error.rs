use std::{io, sync::Arc};

use thiserror::Error;

#[derive(Error, Clone, Debug)]
pub enum TransportError {
    #[error("IO Error: {0:?}")]
    Io(Arc<io::Error>),
    #[error("Other Error: {0}")]
    Other(Arc<anyhow::Error>),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::Io(Arc::new(err))
    }
}

impl From<anyhow::Error> for TransportError {
    fn from(x: anyhow::Error) -> Self {
        TransportError::Other(Arc::new(x))
    }
}

/// Errors caused by what the instrument said (or didn't say), as opposed to the link itself.
#[derive(Error, Clone, Debug)]
pub enum ProtocolError {
    #[error("Timeout")]
    Timeout,
    /// Carries the raw response text.
    #[error("Cannot parse response: {0:?}")]
    Parse(String),
}

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Cannot connect: {0}")]
    Connection(TransportError),
    #[error("Transport Error {0}")]
    Transport(TransportError),
    #[error("Protocol Error {0}")]
    Protocol(ProtocolError),
    #[error("Instrument is not connected")]
    NotConnected,
    #[error("Argument Error {0}")]
    Argument(Arc<anyhow::Error>),
    #[error("Storage Error {0:?}")]
    Storage(Arc<io::Error>),
}

impl Error {
    pub fn connection<T: Into<TransportError>>(err: T) -> Self {
        Self::Connection(err.into())
    }

    pub fn transport<T: Into<TransportError>>(err: T) -> Self {
        Self::Transport(err.into())
    }

    pub fn protocol_timeout() -> Self {
        Error::Protocol(ProtocolError::Timeout)
    }

    pub fn parse<T: Into<String>>(raw: T) -> Self {
        Error::Protocol(ProtocolError::Parse(raw.into()))
    }

    pub fn argument<T: Into<anyhow::Error>>(err: T) -> Self {
        Self::Argument(Arc::new(err.into()))
    }

    pub fn storage(err: io::Error) -> Self {
        Self::Storage(Arc::new(err))
    }

    /// Errors which only affect a single reading. The acquisition loop keeps going after these.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Protocol(_) => true,
            Error::Transport(TransportError::Io(err)) => err.kind() == io::ErrorKind::TimedOut,
            Error::Transport(TransportError::Other(_)) => false,
            Error::Connection(_) => false,
            Error::NotConnected => false,
            Error::Argument(_) => false,
            Error::Storage(_) => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(x: io::Error) -> Self {
        Error::Transport(TransportError::Io(Arc::new(x)))
    }
}

impl From<ProtocolError> for Error {
    fn from(x: ProtocolError) -> Self {
        Error::Protocol(x)
    }
}
