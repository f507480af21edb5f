//! Measurement modes and the parameter values accepted by `CONFigure` commands.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum MeasurementMode {
    #[serde(rename = "DCV")]
    DcVoltage,
    #[serde(rename = "ACV")]
    AcVoltage,
    #[serde(rename = "DCI")]
    DcCurrent,
    #[serde(rename = "ACI")]
    AcCurrent,
    #[serde(rename = "RES2")]
    Resistance2W,
    #[serde(rename = "RES4")]
    Resistance4W,
    #[serde(rename = "FREQ")]
    Frequency,
    #[serde(rename = "PER")]
    Period,
}

impl MeasurementMode {
    pub const ALL: [MeasurementMode; 8] = [
        MeasurementMode::DcVoltage,
        MeasurementMode::AcVoltage,
        MeasurementMode::DcCurrent,
        MeasurementMode::AcCurrent,
        MeasurementMode::Resistance2W,
        MeasurementMode::Resistance4W,
        MeasurementMode::Frequency,
        MeasurementMode::Period,
    ];

    /// Look up a mode by its short tag, e.g. `"DCV"` or `"res4"`.
    /// Returns `None` for tags we don't know about.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.tag().eq_ignore_ascii_case(tag.trim()))
    }

    pub fn tag(&self) -> &'static str {
        match self {
            MeasurementMode::DcVoltage => "DCV",
            MeasurementMode::AcVoltage => "ACV",
            MeasurementMode::DcCurrent => "DCI",
            MeasurementMode::AcCurrent => "ACI",
            MeasurementMode::Resistance2W => "RES2",
            MeasurementMode::Resistance4W => "RES4",
            MeasurementMode::Frequency => "FREQ",
            MeasurementMode::Period => "PER",
        }
    }

    /// The SCPI `CONFigure` verb selecting this mode.
    pub fn scpi_prefix(&self) -> &'static str {
        match self {
            MeasurementMode::DcVoltage => "CONF:VOLT:DC",
            MeasurementMode::AcVoltage => "CONF:VOLT:AC",
            MeasurementMode::DcCurrent => "CONF:CURR:DC",
            MeasurementMode::AcCurrent => "CONF:CURR:AC",
            MeasurementMode::Resistance2W => "CONF:RES",
            MeasurementMode::Resistance4W => "CONF:FRES",
            MeasurementMode::Frequency => "CONF:FREQ",
            MeasurementMode::Period => "CONF:PER",
        }
    }
}

impl Display for MeasurementMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A range or resolution argument: either a number in standard units or one of the
/// keywords understood by the instrument.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ConfValue {
    Value(f64),
    Default,
    Minimum,
    Maximum,
    Auto,
}

impl Display for ConfValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfValue::Value(x) => write!(f, "{}", x),
            ConfValue::Default => f.write_str("DEF"),
            ConfValue::Minimum => f.write_str("MIN"),
            ConfValue::Maximum => f.write_str("MAX"),
            ConfValue::Auto => f.write_str("AUTO"),
        }
    }
}

impl FromStr for ConfValue {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let keyword = s.to_uppercase();
        match keyword.as_str() {
            "DEF" | "DEFAULT" => Ok(ConfValue::Default),
            "MIN" | "MINIMUM" => Ok(ConfValue::Minimum),
            "MAX" | "MAXIMUM" => Ok(ConfValue::Maximum),
            "AUTO" => Ok(ConfValue::Auto),
            _ => s
                .parse::<f64>()
                .map(ConfValue::Value)
                .map_err(|_| crate::Error::argument(anyhow!("Invalid configuration value `{}`", s))),
        }
    }
}

impl From<f64> for ConfValue {
    fn from(x: f64) -> Self {
        ConfValue::Value(x)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawConfValue {
    Number(f64),
    Keyword(String),
}

impl Serialize for ConfValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfValue::Value(x) => RawConfValue::Number(*x),
            other => RawConfValue::Keyword(other.to_string()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConfValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        match RawConfValue::deserialize(deserializer)? {
            RawConfValue::Number(x) => Ok(ConfValue::Value(x)),
            RawConfValue::Keyword(s) => s.parse().map_err(|err: crate::Error| D::Error::custom(err.to_string())),
        }
    }
}
