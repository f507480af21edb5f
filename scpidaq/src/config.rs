//! Run configuration as loaded from a JSON file.
//!
//! ```json
//! {
//!     "mode": "RES2",
//!     "kinds": "meter",
//!     "sleep_interval": 3,
//!     "duration": 30,
//!     "range": 100,
//!     "resolution": 1e-6,
//!     "output_path": "resistance.csv"
//! }
//! ```
//!
//! Every `Setting` accepts either a single value applied to all instruments or a list with
//! one entry per instrument (per scanner for `channels`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::acquisition::{RunPlan, Setting};
use crate::instrument::InstrumentKind;
use crate::transport::serial::SerialParams;
use scpidaq_protocol::{ChannelList, ConfValue, RangeSetting};

/// All the pauses the instruments need to keep up with us.
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    /// After opening the port, before the remote handshake.
    pub port_settle: Duration,
    /// Between two configuration commands to the same instrument.
    pub command_settle: Duration,
    /// Between sending a query and reading the reply.
    pub read_settle: Duration,
    /// After configuring one instrument.
    pub instrument_settle: Duration,
    /// After the last instrument was configured, before the first reading.
    pub acquisition_settle: Duration,
    /// `None` blocks until the instrument answers. A reply which does not parse waits for a
    /// second line, so an instrument answering garbage costs this much on every cycle.
    pub read_timeout: Option<Duration>,
}

impl Default for Timing {
    fn default() -> Self {
        TimingConfig::default().into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub port_settle_ms: u64,
    pub command_settle_ms: u64,
    pub read_settle_ms: u64,
    pub instrument_settle_ms: u64,
    pub acquisition_settle_ms: u64,
    pub read_timeout_ms: Option<u64>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            port_settle_ms: 500,
            command_settle_ms: 100,
            read_settle_ms: 50,
            instrument_settle_ms: 200,
            acquisition_settle_ms: 2000,
            read_timeout_ms: Some(2000),
        }
    }
}

impl From<TimingConfig> for Timing {
    fn from(x: TimingConfig) -> Self {
        Timing {
            port_settle: Duration::from_millis(x.port_settle_ms),
            command_settle: Duration::from_millis(x.command_settle_ms),
            read_settle: Duration::from_millis(x.read_settle_ms),
            instrument_settle: Duration::from_millis(x.instrument_settle_ms),
            acquisition_settle: Duration::from_millis(x.acquisition_settle_ms),
            read_timeout: x.read_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: Setting<String>,
    pub kinds: Setting<InstrumentKind>,
    /// Explicit port addresses. Discovered USB ports are used if absent.
    pub ports: Option<Vec<String>>,
    pub serial: SerialParams,
    /// Seconds between two sample records.
    pub sleep_interval: f64,
    /// Total length of the run in seconds.
    pub duration: f64,
    pub range: Setting<RangeSetting>,
    pub resolution: Setting<ConfValue>,
    pub channels: Option<Setting<ChannelList>>,
    pub output_path: Option<PathBuf>,
    pub timing: TimingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            mode: Setting::All("DCV".to_string()),
            kinds: Setting::All(InstrumentKind::Meter),
            ports: None,
            serial: SerialParams::default(),
            sleep_interval: 0.0,
            duration: 10000.0,
            range: Setting::All(RangeSetting::Uniform(ConfValue::Value(1.0))),
            resolution: Setting::All(ConfValue::Value(1e-6)),
            channels: None,
            output_path: None,
            timing: TimingConfig::default(),
        }
    }
}

fn seconds(what: &str, x: f64) -> crate::Result<Duration> {
    if !x.is_finite() || x < 0.0 {
        return Err(crate::Error::argument(anyhow!("`{}` must be a non-negative number of seconds", what)));
    }
    Ok(Duration::from_secs_f64(x))
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .map_err(|err| crate::Error::argument(anyhow!("Cannot read {}: {}", path.display(), err)))?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> crate::Result<Self> {
        serde_json::from_str(data).map_err(|err| crate::Error::argument(anyhow!("Invalid run configuration: {}", err)))
    }

    pub fn plan(&self) -> crate::Result<RunPlan> {
        Ok(RunPlan {
            mode: self.mode.clone(),
            range: self.range.clone(),
            resolution: self.resolution.clone(),
            channels: self.channels.clone(),
            sleep_interval: seconds("sleep_interval", self.sleep_interval)?,
            duration: seconds("duration", self.duration)?,
            timing: self.timing.clone().into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RunConfig::from_json("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        let plan = config.plan().unwrap();
        assert_eq!(plan.duration, Duration::from_secs(10000));
        assert_eq!(plan.sleep_interval, Duration::from_secs(0));
        assert_eq!(plan.timing, Timing::default());
        assert_eq!(plan.timing.read_timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn full_config() {
        let config = RunConfig::from_json(
            r#"{
                "mode": ["DCV", "RES4"],
                "kinds": ["meter", "scanner"],
                "ports": ["/dev/ttyUSB0", "/dev/ttyUSB1::19200"],
                "sleep_interval": 0.5,
                "duration": 30,
                "range": [10, [1000, 100]],
                "resolution": "DEF",
                "channels": [101, 102],
                "output_path": "out.csv",
                "timing": { "acquisition_settle_ms": 500, "read_timeout_ms": null }
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.mode,
            Setting::PerInstrument(vec!["DCV".to_string(), "RES4".to_string()])
        );
        assert_eq!(
            config.kinds,
            Setting::PerInstrument(vec![InstrumentKind::Meter, InstrumentKind::Scanner])
        );
        assert_eq!(
            config.range,
            Setting::PerInstrument(vec![
                RangeSetting::Uniform(ConfValue::Value(10.0)),
                RangeSetting::PerChannel(vec![ConfValue::Value(1000.0), ConfValue::Value(100.0)]),
            ])
        );
        assert_eq!(config.resolution, Setting::All(ConfValue::Default));
        assert_eq!(
            config.channels,
            Some(Setting::All(ChannelList::new(vec![101, 102]).unwrap()))
        );
        let plan = config.plan().unwrap();
        assert_eq!(plan.sleep_interval, Duration::from_millis(500));
        assert_eq!(plan.timing.acquisition_settle, Duration::from_millis(500));
        assert_eq!(plan.timing.port_settle, Duration::from_millis(500));
        assert_eq!(plan.timing.read_timeout, None);
    }

    #[test]
    fn invalid_durations() {
        let config = RunConfig {
            duration: -1.0,
            ..Default::default()
        };
        assert!(config.plan().is_err());
        assert!(RunConfig::from_json(r#"{ "duration": "long" }"#).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{ "mode": "FREQ", "duration": 5 }"#).unwrap();
        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.mode, Setting::All("FREQ".to_string()));
        assert_eq!(config.duration, 5.0);
        assert!(RunConfig::load(dir.path().join("missing.json")).is_err());
    }
}
