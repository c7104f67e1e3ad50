//! The session monitor: a periodic sweep over today's confirmed
//! reservations that warns about late arrivals, cancels no-shows, and
//! closes out sessions that ran past their end.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::calendar::{LocalNow, Minute};
use crate::engine::{Engine, Outcome};
use crate::model::{Presence, ReservationFilter, Status};
use crate::notify::Alert;
use crate::observability;

/// Minutes past start before a late-arrival warning is raised.
pub const NO_SHOW_WARN_MINUTES: Minute = 15;
/// Minutes past start before a no-show is cancelled.
pub const NO_SHOW_CANCEL_MINUTES: Minute = 45;
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One sweeper's memory of what it already acted on. The sets are
/// process-local: after a restart the cancel write resolves to `NoOp`
/// against the store, so at worst one duplicate warning is re-emitted.
pub struct SessionMonitor {
    warned: HashSet<Ulid>,
    cancelled: HashSet<Ulid>,
}

impl SessionMonitor {
    pub fn new() -> Self {
        Self {
            warned: HashSet::new(),
            cancelled: HashSet::new(),
        }
    }

    /// One pass over today's confirmed reservations at the given instant.
    /// Write failures are logged and left for the next sweep; a guard set
    /// is only marked after the write succeeds.
    pub async fn sweep(&mut self, engine: &Engine, now: LocalNow) {
        let started = Instant::now();
        metrics::counter!(observability::SWEEPS_TOTAL).increment(1);

        let today = match engine
            .reservations(&ReservationFilter {
                date: Some(now.date),
                status: Some(Status::Confirmed),
                ..Default::default()
            })
            .await
        {
            Ok(rs) => rs,
            Err(e) => {
                warn!(error = %e, "sweep query failed; retrying next tick");
                metrics::counter!(observability::SWEEP_WRITE_FAILURES_TOTAL).increment(1);
                return;
            }
        };

        for r in today {
            let Some(first) = r.first_start_minute() else {
                continue;
            };
            let last_end = r.last_end_minute().unwrap_or(first);

            match r.presence() {
                Presence::CheckedIn if now.minute >= last_end => {
                    match engine.auto_check_out(r.id, now).await {
                        Ok(Outcome::Applied) => {
                            info!(id = %r.id, receipt = %r.receipt_no, "auto checked out");
                            metrics::counter!(observability::AUTO_CHECKOUTS_TOTAL).increment(1);
                            engine.alerts().send(Alert::AutoCheckedOut { reservation: r });
                        }
                        Ok(Outcome::NoOp) => debug!(id = %r.id, "already checked out"),
                        Err(e) => {
                            warn!(id = %r.id, error = %e, "auto check-out failed; retrying next tick");
                            metrics::counter!(observability::SWEEP_WRITE_FAILURES_TOTAL)
                                .increment(1);
                        }
                    }
                }
                Presence::Waiting if now.minute >= first => {
                    let minutes_late = now.minute - first;
                    if minutes_late >= NO_SHOW_CANCEL_MINUTES {
                        if self.cancelled.contains(&r.id) {
                            continue;
                        }
                        match engine.auto_cancel_no_show(r.id).await {
                            Ok(outcome) => {
                                self.cancelled.insert(r.id);
                                if outcome == Outcome::Applied {
                                    info!(id = %r.id, receipt = %r.receipt_no, minutes_late, "no-show cancelled");
                                    metrics::counter!(
                                        observability::NO_SHOW_CANCELLATIONS_TOTAL
                                    )
                                    .increment(1);
                                    engine
                                        .alerts()
                                        .send(Alert::NoShowCancelled { reservation: r });
                                }
                            }
                            Err(e) => {
                                // Not marked: re-attempted next sweep.
                                warn!(id = %r.id, error = %e, "no-show cancel failed; retrying next tick");
                                metrics::counter!(observability::SWEEP_WRITE_FAILURES_TOTAL)
                                    .increment(1);
                            }
                        }
                    } else if minutes_late >= NO_SHOW_WARN_MINUTES
                        && self.warned.insert(r.id)
                    {
                        info!(id = %r.id, receipt = %r.receipt_no, minutes_late, "late arrival");
                        metrics::counter!(observability::LATE_WARNINGS_TOTAL).increment(1);
                        engine.alerts().send(Alert::LateArrival {
                            reservation: r,
                            minutes_late,
                        });
                    }
                }
                _ => {}
            }
        }

        metrics::histogram!(observability::SWEEP_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
    }
}

impl Default for SessionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the sweep against the wall clock until the task is aborted.
pub async fn run_monitor(engine: Arc<Engine>) {
    let mut monitor = SessionMonitor::new();
    let mut ticks = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticks.tick().await;
        monitor.sweep(&engine, LocalNow::now()).await;
    }
}
