//! The timed acquisition loop.
//!
//! All instruments are configured once, then read in a fixed order every
//! `sleep_interval` until `duration` has elapsed or the run is cancelled. Every cycle
//! produces one [`Record`], printed to stdout and appended to a [`Sink`].

use std::iter;

use anyhow::anyhow;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{sleep, Instant};

use crate::instrument::Instrument;
use crate::sample::{Reading, Record};
use crate::sink::Sink;
use crate::Error;

pub use cancel::{cancellation, Cancelled, Canceller};
pub use plan::{RunPlan, Setting};

mod cancel;
mod plan;

async fn configure_all<T>(instruments: &mut [Instrument<T>], plan: &RunPlan) -> crate::Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let kinds: Vec<_> = instruments.iter().map(|x| x.kind()).collect();
    let setups = plan.setups(&kinds)?;
    for (instrument, setup) in instruments.iter_mut().zip(&setups) {
        log::info!("Configuring {} on {}", instrument.kind(), instrument.name());
        instrument.configure(setup).await?;
        sleep(plan.timing.instrument_settle).await;
    }
    sleep(plan.timing.acquisition_settle).await;
    Ok(())
}

async fn read_all<T>(instruments: &mut [Instrument<T>], width: usize) -> crate::Result<Vec<Reading>>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut ret = Vec::with_capacity(width);
    for instrument in instruments.iter_mut() {
        match instrument.read().await {
            Ok(sample) => ret.extend(sample.into_readings()),
            Err(err) if err.is_recoverable() => {
                log::warn!("[{}] Reading failed: {}", instrument.name(), err);
                let reading = match &err {
                    Error::Protocol(x) => Reading::from(x),
                    _ => Reading::Timeout,
                };
                ret.extend(iter::repeat(reading).take(instrument.width()));
            }
            Err(err) => {
                log::error!("[{}] Reading failed: {}", instrument.name(), err);
                return Err(err);
            }
        }
    }
    Ok(ret)
}

/// Configure `instruments` according to `plan` and sample them until the run is over.
///
/// Readings which cannot be obtained are recorded as invalid, transport and sink errors
/// end the run. A cancelled run is not an error: the records collected so far are returned.
pub async fn run<T, S>(
    instruments: &mut [Instrument<T>],
    plan: &RunPlan,
    sink: &mut S,
    mut cancel: Cancelled,
) -> crate::Result<Vec<Record>>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
    S: Sink + ?Sized,
{
    if instruments.is_empty() {
        return Err(Error::argument(anyhow!("No instruments to acquire from")));
    }
    configure_all(instruments, plan).await?;

    let width: usize = instruments.iter().map(|x| x.width()).sum();
    log::info!(
        "Acquiring {} values every {:?} for {:?}",
        width,
        plan.sleep_interval,
        plan.duration
    );

    let mut records = Vec::new();
    let start = Instant::now();
    loop {
        if cancel.is_cancelled() {
            log::info!("Acquisition cancelled after {} records", records.len());
            break;
        }
        let elapsed = start.elapsed();
        if elapsed >= plan.duration {
            break;
        }
        let readings = read_all(instruments, width).await?;
        let record = Record { elapsed, readings };
        println!("{}", record.to_tsv());
        sink.append(&record.to_csv()).await?;
        records.push(record);

        tokio::select! {
            _ = sleep(plan.sleep_interval) => {},
            _ = cancel.cancelled() => {},
        }
    }
    sink.finish().await?;
    let invalid = records
        .iter()
        .flat_map(|x| x.readings.iter())
        .filter(|x| !x.is_valid())
        .count();
    log::info!(
        "Acquisition finished with {} records, {} readings invalid",
        records.len(),
        invalid
    );
    Ok(records)
}
