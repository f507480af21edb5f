//! Instrument-independent parts of the SCPI acquisition stack: measurement modes, command
//! encoding, response parsing and the error types shared with the `scpidaq` crate.

pub mod command;
pub mod error;
pub mod mode;
pub mod response;
pub mod scpi;

pub use crate::command::{encode, encode_scanner, ChannelList, ConfigParams, RangeSetting};
pub use crate::error::{Error, ProtocolError, TransportError};
pub use crate::mode::{ConfValue, MeasurementMode};
pub use crate::response::{parse, parse_scalar, parse_segments, parse_vector, Response};
pub use crate::scpi::TriggerSource;

pub type Result<T> = std::result::Result<T, Error>;
