use std::time::Duration;

use tokio::sync::watch;

use crate::fleet::Fleet;
use crate::verifier::{OutputVerifier, RangeVerdict};

/// Hands the process interrupt (Ctrl-C) to the scheduler as an awaitable
/// edge instead of a signal handler mutating shared state.
///
/// The controller latches: once the interrupt has fired, every later wait
/// resolves immediately, so a second Ctrl-C during shutdown changes nothing.
#[derive(Debug)]
pub struct InterruptController {
    rx: watch::Receiver<bool>,
}

/// Fires a manually constructed controller from code. Used by tests and by
/// embedders that map something other than a signal onto the interrupt.
#[derive(Debug)]
pub struct InterruptHandle {
    tx: watch::Sender<bool>,
}

impl InterruptHandle {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

impl InterruptController {
    /// Arms the process-wide Ctrl-C hook. Call once at startup, inside the
    /// runtime.
    pub fn install() -> Self {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log::info!("[Interrupt] interrupt received, shutting the fleet down");
                    let _ = tx.send(true);
                }
                Err(e) => {
                    // No handler could be registered; the run continues and
                    // only the fault schedule can end it.
                    log::warn!("[Interrupt] could not listen for Ctrl-C: {}", e);
                }
            }
        });
        InterruptController { rx }
    }

    /// A controller plus the handle that fires it, with no signal involved.
    pub fn manual() -> (InterruptHandle, InterruptController) {
        let (tx, rx) = watch::channel(false);
        (InterruptHandle { tx }, InterruptController { rx })
    }

    /// Resolves once the interrupt has been delivered. If the interrupt
    /// source goes away without ever firing, pends forever.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// The interrupt shutdown path: kill everything that is left, give the
    /// children the grace period to flush, then verify the whole index
    /// range in one pass.
    pub async fn shutdown_fleet(
        fleet: &mut Fleet,
        verifier: &OutputVerifier,
        grace_period: Duration,
    ) -> RangeVerdict {
        log::info!(
            "[Interrupt] terminating {} running pipelines",
            fleet.running_count()
        );
        fleet.terminate_all().await;
        tokio::time::sleep(grace_period).await;
        verifier.verify_all(fleet.len())
    }
}
