use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::config::Timing;
use crate::instrument::{InstrumentKind, MeterSetup, ScannerSetup, Setup};
use crate::Error;
use scpidaq_protocol::{ChannelList, ConfValue, RangeSetting};

/// Either one value for every instrument or one value per instrument.
///
/// When deserializing, a list is always taken as one entry per instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Setting<T> {
    PerInstrument(Vec<T>),
    All(T),
}

impl<T: Clone> Setting<T> {
    /// Expand to exactly `count` values.
    pub fn resolve(&self, count: usize, what: &str) -> crate::Result<Vec<T>> {
        match self {
            Setting::All(x) => Ok(vec![x.clone(); count]),
            Setting::PerInstrument(x) if x.len() == count => Ok(x.clone()),
            Setting::PerInstrument(x) => Err(Error::argument(anyhow!(
                "`{}` has {} entries but there are {} instruments",
                what,
                x.len(),
                count
            ))),
        }
    }
}

impl<T> From<T> for Setting<T> {
    fn from(x: T) -> Self {
        Setting::All(x)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub mode: Setting<String>,
    pub range: Setting<RangeSetting>,
    pub resolution: Setting<ConfValue>,
    /// Shared by all scanners or one per scanner. Meters ignore it.
    pub channels: Option<Setting<ChannelList>>,
    pub sleep_interval: Duration,
    pub duration: Duration,
    pub timing: Timing,
}

impl RunPlan {
    /// Build the configuration of each instrument, in order.
    pub fn setups(&self, kinds: &[InstrumentKind]) -> crate::Result<Vec<Setup>> {
        let count = kinds.len();
        let modes = self.mode.resolve(count, "mode")?;
        let ranges = self.range.resolve(count, "range")?;
        let resolutions = self.resolution.resolve(count, "resolution")?;

        let scanners = kinds.iter().filter(|x| **x == InstrumentKind::Scanner).count();
        let channels = match (&self.channels, scanners) {
            (_, 0) => Vec::new(),
            (Some(channels), n) => channels.resolve(n, "channels")?,
            (None, _) => return Err(Error::argument(anyhow!("Scanners require a channel list"))),
        };
        let mut channels = channels.into_iter();

        let mut ret = Vec::with_capacity(count);
        for (idx, kind) in kinds.iter().enumerate() {
            let mode = modes[idx].clone();
            let resolution = resolutions[idx];
            let setup = match kind {
                InstrumentKind::Meter => {
                    let range = match &ranges[idx] {
                        RangeSetting::Uniform(x) => *x,
                        RangeSetting::PerChannel(_) => {
                            return Err(Error::argument(anyhow!(
                                "Instrument {} is a meter and cannot take one range per channel",
                                idx
                            )))
                        }
                    };
                    Setup::Meter(MeterSetup { mode, range, resolution })
                }
                InstrumentKind::Scanner => Setup::Scanner(ScannerSetup {
                    mode,
                    range: ranges[idx].clone(),
                    resolution,
                    channels: channels
                        .next()
                        .ok_or_else(|| Error::argument(anyhow!("Missing channel list for instrument {}", idx)))?,
                }),
            };
            ret.push(setup);
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> RunPlan {
        RunPlan {
            mode: "DCV".to_string().into(),
            range: RangeSetting::Uniform(ConfValue::Value(10.0)).into(),
            resolution: ConfValue::Default.into(),
            channels: None,
            sleep_interval: Duration::from_secs(1),
            duration: Duration::from_secs(5),
            timing: Timing::default(),
        }
    }

    #[test]
    fn resolve_settings() {
        assert_eq!(Setting::All(1).resolve(3, "x").unwrap(), vec![1, 1, 1]);
        assert_eq!(Setting::PerInstrument(vec![1, 2]).resolve(2, "x").unwrap(), vec![1, 2]);
        assert!(matches!(
            Setting::PerInstrument(vec![1, 2]).resolve(3, "x"),
            Err(Error::Argument(_))
        ));
    }

    #[test]
    fn list_means_per_instrument() {
        let x: Setting<ConfValue> = serde_json::from_str("[1, \"MAX\"]").unwrap();
        assert_eq!(
            x,
            Setting::PerInstrument(vec![ConfValue::Value(1.0), ConfValue::Maximum])
        );
        let x: Setting<ConfValue> = serde_json::from_str("\"AUTO\"").unwrap();
        assert_eq!(x, Setting::All(ConfValue::Auto));
    }

    #[test]
    fn meters_ignore_channels() {
        let kinds = [InstrumentKind::Meter, InstrumentKind::Meter];
        let without = plan().setups(&kinds).unwrap();
        let with = RunPlan {
            channels: Some(ChannelList::new(vec![101, 102]).unwrap().into()),
            ..plan()
        }
        .setups(&kinds)
        .unwrap();
        assert_eq!(without, with);
        assert_eq!(
            without[0],
            Setup::Meter(MeterSetup {
                mode: "DCV".to_string(),
                range: ConfValue::Value(10.0),
                resolution: ConfValue::Default,
            })
        );
    }

    #[test]
    fn channels_are_assigned_per_scanner() {
        let kinds = [InstrumentKind::Scanner, InstrumentKind::Meter, InstrumentKind::Scanner];
        let first = ChannelList::new(vec![101, 102]).unwrap();
        let second = ChannelList::new(vec![201]).unwrap();
        let plan = RunPlan {
            mode: Setting::PerInstrument(vec!["DCV".to_string(), "RES2".to_string(), "FREQ".to_string()]),
            channels: Some(Setting::PerInstrument(vec![first.clone(), second.clone()])),
            ..plan()
        };
        let setups = plan.setups(&kinds).unwrap();
        match (&setups[0], &setups[1], &setups[2]) {
            (Setup::Scanner(a), Setup::Meter(b), Setup::Scanner(c)) => {
                assert_eq!(a.channels, first);
                assert_eq!(b.mode, "RES2");
                assert_eq!(c.channels, second);
                assert_eq!(c.mode, "FREQ");
            }
            x => panic!("unexpected setups: {:?}", x),
        }
    }

    #[test]
    fn inconsistent_plans() {
        let scanner = [InstrumentKind::Scanner];
        assert!(matches!(plan().setups(&scanner), Err(Error::Argument(_))));

        let meters = [InstrumentKind::Meter, InstrumentKind::Meter];
        let plan_with_modes = RunPlan {
            mode: Setting::PerInstrument(vec!["DCV".to_string()]),
            ..plan()
        };
        assert!(matches!(plan_with_modes.setups(&meters), Err(Error::Argument(_))));

        let per_channel = RunPlan {
            range: RangeSetting::PerChannel(vec![ConfValue::Value(1.0)]).into(),
            ..plan()
        };
        assert!(matches!(per_channel.setups(&meters), Err(Error::Argument(_))));
    }
}
