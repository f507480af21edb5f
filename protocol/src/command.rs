//! Builds the `CONFigure` commands sent to meters and scanners.

use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::mode::{ConfValue, MeasurementMode};

/// Ordered, non-empty list of scanner channels, e.g. `101,102,103`.
#[derive(Debug, Eq, PartialEq, Clone, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct ChannelList(Vec<u32>);

impl ChannelList {
    pub fn new(channels: Vec<u32>) -> crate::Result<Self> {
        if channels.is_empty() {
            return Err(crate::Error::argument(anyhow!("Channel list must not be empty")));
        }
        if channels.iter().any(|x| *x == 0) {
            return Err(crate::Error::argument(anyhow!("Channel indices must be positive")));
        }
        Ok(ChannelList(channels))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl TryFrom<Vec<u32>> for ChannelList {
    type Error = crate::Error;

    fn try_from(channels: Vec<u32>) -> Result<Self, Self::Error> {
        ChannelList::new(channels)
    }
}

impl From<ChannelList> for Vec<u32> {
    fn from(x: ChannelList) -> Self {
        x.0
    }
}

impl Display for ChannelList {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(|x| x.to_string()).collect();
        write!(f, "(@{})", joined.join(","))
    }
}

/// The range argument of a configuration. Scanners may take one range per channel.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeSetting {
    PerChannel(Vec<ConfValue>),
    Uniform(ConfValue),
}

impl From<ConfValue> for RangeSetting {
    fn from(x: ConfValue) -> Self {
        RangeSetting::Uniform(x)
    }
}

impl From<f64> for RangeSetting {
    fn from(x: f64) -> Self {
        RangeSetting::Uniform(ConfValue::Value(x))
    }
}

pub struct ConfigParams<'a> {
    pub range: ConfValue,
    pub resolution: ConfValue,
    pub channels: Option<&'a ChannelList>,
}

impl<'a> ConfigParams<'a> {
    fn tail(&self) -> String {
        match self.channels {
            None => format!("{}, {}", self.range, self.resolution),
            Some(channels) => format!("{}, {}, {}", self.range, self.resolution, channels),
        }
    }
}

impl MeasurementMode {
    pub fn configure_command(&self, params: &ConfigParams) -> String {
        format!("{} {}", self.scpi_prefix(), params.tail())
    }
}

/// Encode a configuration command for the mode given by `tag`.
/// Unknown tags yield no command at all.
pub fn encode(tag: &str, params: &ConfigParams) -> Option<String> {
    MeasurementMode::from_tag(tag).map(|mode| mode.configure_command(params))
}

/// Encode the configuration of a scanner. A uniform range is sent as one command over all
/// channels, a per-channel range list as one independent command per channel.
pub fn encode_scanner(
    tag: &str,
    range: &RangeSetting,
    resolution: ConfValue,
    channels: &ChannelList,
) -> crate::Result<Vec<String>> {
    let mode = match MeasurementMode::from_tag(tag) {
        Some(mode) => mode,
        None => return Ok(Vec::new()),
    };
    match range {
        RangeSetting::Uniform(range) => {
            let params = ConfigParams {
                range: *range,
                resolution,
                channels: Some(channels),
            };
            Ok(vec![mode.configure_command(&params)])
        }
        RangeSetting::PerChannel(ranges) => {
            if ranges.len() != channels.len() {
                return Err(crate::Error::argument(anyhow!(
                    "Got {} ranges for {} channels",
                    ranges.len(),
                    channels.len()
                )));
            }
            let ret = ranges
                .iter()
                .zip(channels.iter())
                .map(|(range, channel)| {
                    let single = ChannelList(vec![channel]);
                    let params = ConfigParams {
                        range: *range,
                        resolution,
                        channels: Some(&single),
                    };
                    mode.configure_command(&params)
                })
                .collect();
            Ok(ret)
        }
    }
}
