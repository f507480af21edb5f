use anyhow::anyhow;
use tokio::io::{AsyncRead, AsyncWrite};

use super::{Link, ScannerSetup, State};
use crate::sample::Reading;
use crate::Error;
use scpidaq_protocol::{encode_scanner, parse_segments, parse_vector, ChannelList};

/// A multiplexing data acquisition unit such as the 34970A. One `READ?` scans all
/// configured channels.
pub struct Scanner<T> {
    pub(super) link: Link<T>,
    channels: Option<ChannelList>,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Scanner<T> {
    pub(super) fn new(link: Link<T>) -> Self {
        Scanner { link, channels: None }
    }

    pub fn width(&self) -> usize {
        self.channels.as_ref().map(|x| x.len()).unwrap_or(0)
    }

    pub async fn configure(&mut self, setup: &ScannerSetup) -> crate::Result<()> {
        self.link.ensure_open()?;
        let commands = encode_scanner(&setup.mode, &setup.range, setup.resolution, &setup.channels)?;
        self.channels = Some(setup.channels.clone());
        if commands.is_empty() {
            log::warn!(
                "[{}] Unknown measurement mode `{}`, configuration skipped",
                self.link.name(),
                setup.mode
            );
        }
        self.link.send_commands(&commands).await?;
        self.link.state = State::Configured;
        Ok(())
    }

    /// Scan all configured channels. Always returns one reading per channel unless the whole
    /// reply is unusable, in which case a parse error is returned.
    pub async fn read(&mut self) -> crate::Result<Vec<Reading>> {
        self.link.ensure_open()?;
        let width = match &self.channels {
            Some(x) => x.len(),
            None => {
                return Err(Error::argument(anyhow!(
                    "Scanner on {} must be configured before reading",
                    self.link.name()
                )))
            }
        };
        self.link.state = State::Reading;
        let readings: Vec<Reading> = match self.link.read_reply(parse_vector).await? {
            Ok(values) => values.into_iter().map(Reading::Value).collect(),
            Err(raw) => {
                let segments = parse_segments(&raw);
                if segments.iter().all(|x| x.is_err()) {
                    return Err(Error::parse(raw));
                }
                segments
                    .into_iter()
                    .map(|x| match x {
                        Ok(value) => Reading::Value(value),
                        Err(text) => Reading::Invalid(text),
                    })
                    .collect()
            }
        };
        Ok(self.fit(readings, width))
    }

    fn fit(&self, mut readings: Vec<Reading>, width: usize) -> Vec<Reading> {
        if readings.len() != width {
            log::warn!(
                "[{}] Got {} values for {} channels",
                self.link.name(),
                readings.len(),
                width
            );
            readings.resize(width, Reading::Invalid(String::new()));
        }
        readings
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Instrument, InstrumentKind, Setup};
    use super::*;
    use crate::config::Timing;
    use crate::sample::Sample;
    use crate::testing::{settle, simulate, CommandLog, Replies};
    use scpidaq_protocol::{ConfValue, ProtocolError, RangeSetting};
    use std::time::Duration;
    use tokio::io::DuplexStream;
    use tokio::time::Instant;

    fn setup(range: RangeSetting) -> Setup {
        Setup::Scanner(ScannerSetup {
            mode: "DCV".to_string(),
            range,
            resolution: ConfValue::Default,
            channels: ChannelList::new(vec![101, 102, 103]).unwrap(),
        })
    }

    async fn scanner(replies: Replies) -> (Instrument<DuplexStream>, CommandLog) {
        let (stream, log) = simulate(replies);
        let scanner = Instrument::connect(InstrumentKind::Scanner, "sim", stream, &Timing::default())
            .await
            .unwrap();
        (scanner, log)
    }

    #[tokio::test(start_paused = true)]
    async fn uniform_range_is_one_command() {
        let (mut scanner, log) = scanner(Replies::new()).await;
        scanner.configure(&setup(10.0.into())).await.unwrap();
        settle().await;
        assert_eq!(
            log.commands(),
            vec!["SYSTem:REMote", "CONF:VOLT:DC 10, DEF, (@101,102,103)"]
        );
        assert_eq!(scanner.width(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn per_channel_ranges_are_separate_commands() {
        let (mut scanner, log) = scanner(Replies::new()).await;
        let ranges = RangeSetting::PerChannel(vec![10.0.into(), 20.0.into(), 30.0.into()]);
        let start = Instant::now();
        scanner.configure(&setup(ranges)).await.unwrap();
        // two pauses between three commands
        assert!(start.elapsed() >= Duration::from_millis(200));
        settle().await;
        assert_eq!(
            log.commands(),
            vec![
                "SYSTem:REMote",
                "CONF:VOLT:DC 10, DEF, (@101)",
                "CONF:VOLT:DC 20, DEF, (@102)",
                "CONF:VOLT:DC 30, DEF, (@103)",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reads_all_channels() {
        let (mut scanner, _log) = scanner(Replies::new().read("+1.0E+00,+2.0E+00,+3.0E+00\r\n")).await;
        scanner.configure(&setup(10.0.into())).await.unwrap();
        let sample = scanner.read().await.unwrap();
        assert_eq!(
            sample,
            Sample::Vector(vec![Reading::Value(1.0), Reading::Value(2.0), Reading::Value(3.0)])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn bad_segments_degrade_individually() {
        let replies = Replies::new().read("1.0,OVLD,3.0\r\n1.0,OVLD,3.0\r\n");
        let (mut scanner, _log) = scanner(replies).await;
        scanner.configure(&setup(10.0.into())).await.unwrap();
        let sample = scanner.read().await.unwrap();
        assert_eq!(
            sample,
            Sample::Vector(vec![
                Reading::Value(1.0),
                Reading::Invalid("OVLD".to_string()),
                Reading::Value(3.0)
            ])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_reply_waits_for_second_line() {
        let (mut scanner, _log) = scanner(Replies::new().read("1.0,OVLD,3.0\r\n")).await;
        scanner.configure(&setup(10.0.into())).await.unwrap();
        let start = Instant::now();
        let sample = scanner.read().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(
            sample.into_readings()[1],
            Reading::Invalid("OVLD".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn all_segments_bad_is_a_parse_error() {
        let (mut scanner, _log) = scanner(Replies::new().read("ERR-INVALID\r\n")).await;
        scanner.configure(&setup(10.0.into())).await.unwrap();
        match scanner.read().await {
            Err(Error::Protocol(ProtocolError::Parse(raw))) => assert_eq!(raw, "ERR-INVALID"),
            x => panic!("unexpected result: {:?}", x.map(|_| ())),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn short_reply_is_padded() {
        let (mut scanner, _log) = scanner(Replies::new().read("1.0,2.0\r\n")).await;
        scanner.configure(&setup(10.0.into())).await.unwrap();
        let sample = scanner.read().await.unwrap();
        assert_eq!(sample.len(), 3);
        assert_eq!(sample.into_readings()[2], Reading::Invalid(String::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_scanner_cannot_read() {
        let (mut scanner, _log) = scanner(Replies::new().read("1.0\r\n")).await;
        assert!(matches!(scanner.read().await, Err(Error::Argument(_))));
    }
}
