use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

pub fn cancellation() -> (Canceller, Cancelled) {
    let (tx, rx) = watch::channel(false);
    (Canceller(Arc::new(tx)), Cancelled(rx))
}

/// Requests an acquisition run to stop after the current cycle.
#[derive(Clone)]
pub struct Canceller(Arc<watch::Sender<bool>>);

impl Canceller {
    pub fn cancel(&self) {
        // the run may already be over
        let _ = self.0.send(true);
    }

    /// Cancel once Ctrl-C is pressed.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log::info!("Interrupted, stopping acquisition");
                    this.cancel();
                }
                Err(err) => log::error!("Cannot listen for Ctrl-C: {}", err),
            }
        })
    }
}

#[derive(Clone)]
pub struct Cancelled(watch::Receiver<bool>);

impl Cancelled {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancelled. Never resolves if every [`Canceller`] was dropped first.
    pub async fn cancelled(&mut self) {
        while !self.is_cancelled() {
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    #[tokio::test(start_paused = true)]
    async fn cancel_wakes_waiter() {
        let (canceller, mut cancelled) = cancellation();
        assert!(!cancelled.is_cancelled());
        let task = tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });
        cancelled.cancelled().await;
        assert!(cancelled.is_cancelled());
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_canceller_never_cancels() {
        let (canceller, mut cancelled) = cancellation();
        drop(canceller);
        assert!(timeout(Duration::from_secs(10), cancelled.cancelled()).await.is_err());
        assert!(!cancelled.is_cancelled());
    }
}
