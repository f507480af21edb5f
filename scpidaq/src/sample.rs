use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use scpidaq_protocol::ProtocolError;

/// Value written to sinks in place of a reading which could not be obtained.
pub const INVALID_SENTINEL: &str = "NaN";

/// A single value of one instrument channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Value(f64),
    /// The instrument answered with something which is not a number.
    Invalid(String),
    /// The instrument did not answer in time.
    Timeout,
}

impl Reading {
    pub fn is_valid(&self) -> bool {
        matches!(self, Reading::Value(_))
    }

    fn csv_field(&self) -> String {
        match self {
            Reading::Value(x) => x.to_string(),
            Reading::Invalid(_) | Reading::Timeout => INVALID_SENTINEL.to_string(),
        }
    }
}

impl From<&ProtocolError> for Reading {
    fn from(err: &ProtocolError) -> Self {
        match err {
            ProtocolError::Timeout => Reading::Timeout,
            ProtocolError::Parse(raw) => Reading::Invalid(raw.clone()),
        }
    }
}

impl Display for Reading {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Value(x) => write!(f, "{}", x),
            Reading::Invalid(raw) => write!(f, "{:?}", raw),
            Reading::Timeout => f.write_str("timeout"),
        }
    }
}

/// Result of reading one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Scalar(Reading),
    Vector(Vec<Reading>),
}

impl Sample {
    pub fn len(&self) -> usize {
        match self {
            Sample::Scalar(_) => 1,
            Sample::Vector(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_readings(self) -> Vec<Reading> {
        match self {
            Sample::Scalar(x) => vec![x],
            Sample::Vector(x) => x,
        }
    }
}

/// One row of an acquisition run: time since start and one reading per instrument channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub elapsed: Duration,
    pub readings: Vec<Reading>,
}

impl Record {
    /// Number of columns including the elapsed time.
    pub fn width(&self) -> usize {
        self.readings.len() + 1
    }

    /// `elapsed,v1,v2,...` with invalid readings replaced by [`INVALID_SENTINEL`].
    pub fn to_csv(&self) -> String {
        let mut fields = Vec::with_capacity(self.width());
        fields.push(self.elapsed.as_secs_f64().to_string());
        fields.extend(self.readings.iter().map(Reading::csv_field));
        fields.join(",")
    }

    /// Tab separated line for the console, keeping the raw text of bad readings.
    pub fn to_tsv(&self) -> String {
        let mut fields = Vec::with_capacity(self.width());
        fields.push(format!("{:.3}", self.elapsed.as_secs_f64()));
        fields.extend(self.readings.iter().map(|x| x.to_string()));
        fields.join("\t")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record {
            elapsed: Duration::from_millis(1500),
            readings: vec![
                Reading::Value(1.25),
                Reading::Invalid("ERR-INVALID".to_string()),
                Reading::Timeout,
            ],
        }
    }

    #[test]
    fn csv_line() {
        assert_eq!(record().to_csv(), "1.5,1.25,NaN,NaN");
        assert_eq!(record().width(), 4);
    }

    #[test]
    fn console_line() {
        assert_eq!(record().to_tsv(), "1.500\t1.25\t\"ERR-INVALID\"\ttimeout");
    }

    #[test]
    fn reading_from_protocol_error() {
        assert_eq!(Reading::from(&ProtocolError::Timeout), Reading::Timeout);
        assert_eq!(
            Reading::from(&ProtocolError::Parse("x".to_string())),
            Reading::Invalid("x".to_string())
        );
        assert!(!Reading::Timeout.is_valid());
        assert!(Reading::Value(2.0).is_valid());
    }

    #[test]
    fn flatten_samples() {
        let x = Sample::Vector(vec![Reading::Value(1.0), Reading::Value(2.0)]);
        assert_eq!(x.len(), 2);
        assert_eq!(x.into_readings().len(), 2);
        assert_eq!(Sample::Scalar(Reading::Timeout).into_readings(), vec![Reading::Timeout]);
    }
}
