//! Alert fan-out and snapshot differencing.
//!
//! The store feed carries full snapshots; [`DeltaNotifier`] turns
//! consecutive snapshots into "newly entered status X" sets, and
//! [`run_notifier`] converts those into [`Alert`]s on the hub. The first
//! snapshot a notifier sees is its baseline and produces no alerts, so a
//! process restart never replays history.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::calendar::Minute;
use crate::engine::store::ReservationStore;
use crate::model::{Reservation, Status};
use crate::observability;

const CHANNEL_CAPACITY: usize = 256;

/// Discrete events worth a sound or a toast somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    /// A new pending request appeared (operator side).
    RequestReceived { reservation: Reservation },
    /// A reservation was confirmed (requester side).
    BookingConfirmed { reservation: Reservation },
    /// Confirmed session started and nobody checked in yet.
    LateArrival {
        reservation: Reservation,
        minutes_late: Minute,
    },
    /// Grace window expired; the monitor cancelled the session.
    NoShowCancelled { reservation: Reservation },
    /// Session end passed while still checked in.
    AutoCheckedOut { reservation: Reservation },
}

/// Broadcast hub for [`Alert`]s. Sending with no subscribers is a no-op.
pub struct AlertHub {
    tx: broadcast::Sender<Alert>,
}

impl AlertHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.tx.subscribe()
    }

    pub fn send(&self, alert: Alert) {
        metrics::counter!(observability::ALERTS_EMITTED_TOTAL).increment(1);
        let _ = self.tx.send(alert);
    }
}

impl Default for AlertHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Set differencing over one watched status. Owns the previous id set;
/// stateless about everything else, so each watcher runs its own.
pub struct DeltaNotifier {
    watched: Status,
    prev: Option<HashSet<Ulid>>,
}

impl DeltaNotifier {
    pub fn new(watched: Status) -> Self {
        Self {
            watched,
            prev: None,
        }
    }

    /// Reservations newly in the watched status since the last snapshot.
    /// The first snapshot only establishes the baseline.
    pub fn observe(&mut self, snapshot: &[Reservation]) -> Vec<Reservation> {
        let current: HashSet<Ulid> = snapshot
            .iter()
            .filter(|r| r.status == self.watched)
            .map(|r| r.id)
            .collect();

        let fresh = match &self.prev {
            None => Vec::new(),
            Some(prev) => snapshot
                .iter()
                .filter(|r| r.status == self.watched && !prev.contains(&r.id))
                .cloned()
                .collect(),
        };
        self.prev = Some(current);
        fresh
    }
}

/// Follow the store feed and raise an alert for every reservation that
/// newly enters `watched`. Runs until the store feed closes.
pub async fn run_notifier(store: Arc<dyn ReservationStore>, hub: Arc<AlertHub>, watched: Status) {
    let mut rx = store.subscribe();
    let mut notifier = DeltaNotifier::new(watched);
    loop {
        match rx.recv().await {
            Ok(snapshot) => {
                for reservation in notifier.observe(&snapshot) {
                    debug!(id = %reservation.id, ?watched, "status delta");
                    let alert = match watched {
                        Status::Pending => Alert::RequestReceived { reservation },
                        Status::Confirmed => Alert::BookingConfirmed { reservation },
                        // Cancellations get targeted alerts from the
                        // monitor, not the generic feed.
                        Status::Cancelled => continue,
                    };
                    hub.send(alert);
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                // Snapshots are self-contained; diffing against the last
                // one we saw still yields every missed arrival.
                warn!(dropped = n, "notifier lagged behind the store feed");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
