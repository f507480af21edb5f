use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

pub const REMOTE: &str = "SYSTem:REMote";
pub const IDENTIFY: &str = "*IDN?";
pub const READ: &str = "READ?";

#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum TriggerSource {
    Immediate,
    Bus,
    External,
}

impl Default for TriggerSource {
    fn default() -> Self {
        TriggerSource::Immediate
    }
}

impl TriggerSource {
    pub fn command(&self) -> String {
        format!("TRIG:SOUR {}", self)
    }
}

impl Display for TriggerSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let x = match self {
            TriggerSource::Immediate => "IMM",
            TriggerSource::Bus => "BUS",
            TriggerSource::External => "EXT",
        };
        f.write_str(x)
    }
}
