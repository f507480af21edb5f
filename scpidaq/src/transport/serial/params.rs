use core::fmt;
use std::fmt::{Display, Formatter};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Eq, PartialEq, Clone, Copy, Serialize, Deserialize, Hash)]
pub enum StopBits {
    One,
    Two,
}

#[derive(Debug, Eq, PartialEq, Clone, Copy, Serialize, Deserialize, Hash)]
pub enum Parity {
    None,
    Odd,
    Even,
}

#[derive(Debug, Eq, PartialEq, Clone, Copy, Serialize, Deserialize, Hash)]
pub enum DataBits {
    Seven,
    Eight,
}

#[derive(Debug, Eq, PartialEq, Clone, Copy, Serialize, Deserialize, Hash)]
pub enum FlowControl {
    NoFlowControl,
    Hardware,
    Software,
}

pub fn parse_serial_settings(settings: &str) -> crate::Result<(DataBits, Parity, StopBits)> {
    let settings = settings.to_lowercase();
    let chars = settings.as_bytes();
    if chars.len() != 3 {
        return Err(crate::Error::argument(anyhow!("Invalid serial settings `{}`", settings)));
    }
    let data_bits = match chars[0] as char {
        '8' => DataBits::Eight,
        '7' => DataBits::Seven,
        _ => return Err(crate::Error::argument(anyhow!("Invalid data bits in `{}`", settings))),
    };
    let parity = match chars[1] as char {
        'n' => Parity::None,
        'o' => Parity::Odd,
        'e' => Parity::Even,
        _ => return Err(crate::Error::argument(anyhow!("Invalid parity in `{}`", settings))),
    };
    let stop_bits = match chars[2] as char {
        '1' => StopBits::One,
        '2' => StopBits::Two,
        _ => return Err(crate::Error::argument(anyhow!("Invalid stop bits in `{}`", settings))),
    };
    Ok((data_bits, parity, stop_bits))
}

/// Line settings of an RS232 instrument port.
///
/// The defaults (9600 baud, 8N2, XON/XOFF) match the factory settings of the 34401A meter
/// and the 34970A data acquisition unit.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize, Hash)]
#[serde(default)]
pub struct SerialParams {
    pub baud: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
    /// Ask the driver to forward received bytes immediately. Linux only.
    pub low_latency: bool,
}

impl Default for SerialParams {
    fn default() -> Self {
        SerialParams {
            baud: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::Two,
            parity: Parity::None,
            flow_control: FlowControl::Software,
            low_latency: true,
        }
    }
}

impl SerialParams {
    /// Parse a port address of the form `/dev/ttyUSB0`, `/dev/ttyUSB0::19200` or
    /// `COM3::9600::8N1`. Missing parts are taken from `defaults`.
    pub fn from_address(addr: &str, defaults: &SerialParams) -> crate::Result<(String, SerialParams)> {
        let splits: Vec<&str> = addr.split("::").collect();
        if splits.is_empty() || splits.len() > 3 || splits[0].is_empty() {
            return Err(crate::Error::argument(anyhow!("Invalid port address `{}`", addr)));
        }
        let mut params = defaults.clone();
        if let Some(baud) = splits.get(1) {
            params.baud = baud
                .parse()
                .map_err(|_| crate::Error::argument(anyhow!("Invalid baud rate in `{}`", addr)))?;
        }
        if let Some(settings) = splits.get(2) {
            let (data_bits, parity, stop_bits) = parse_serial_settings(settings)?;
            params.data_bits = data_bits;
            params.parity = parity;
            params.stop_bits = stop_bits;
        }
        Ok((splits[0].to_string(), params))
    }
}

impl Display for SerialParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let x = format!("{}::{}{}{}", self.baud, self.data_bits, self.parity, self.stop_bits);
        f.write_str(&x)
    }
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(x: StopBits) -> Self {
        match x {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(x: Parity) -> Self {
        match x {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(x: DataBits) -> Self {
        match x {
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(x: FlowControl) -> Self {
        match x {
            FlowControl::NoFlowControl => tokio_serial::FlowControl::None,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
            FlowControl::Software => tokio_serial::FlowControl::Software,
        }
    }
}

impl Display for DataBits {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let x = match self {
            DataBits::Seven => "7",
            DataBits::Eight => "8",
        };
        f.write_str(x)
    }
}

impl Display for Parity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let x = match self {
            Parity::None => "N",
            Parity::Odd => "O",
            Parity::Even => "E",
        };
        f.write_str(x)
    }
}

impl Display for StopBits {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let x = match self {
            StopBits::One => "1",
            StopBits::Two => "2",
        };
        f.write_str(x)
    }
}
