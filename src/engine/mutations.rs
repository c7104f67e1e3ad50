use chrono::NaiveDate;
use tracing::info;
use ulid::Ulid;

use crate::calendar::{LocalNow, Minute, Slot};
use crate::model::{
    new_receipt_no, CancelReason, Patch, Presence, Requester, Reservation, ReservationFilter,
    Status, StudioId,
};
use crate::observability;

use super::conflict::{check_no_conflict, validate_requester, validate_slots};
use super::{AdmissionError, Engine, EngineError, Outcome};

/// Minutes past session start during which self check-in is still allowed.
pub const CHECK_IN_GRACE_MINUTES: Minute = 30;

impl Engine {
    // ── Creation ─────────────────────────────────────────────

    /// Requester-facing booking: lands as `pending` for operator review.
    pub async fn submit_request(
        &self,
        requester: Requester,
        studio: StudioId,
        date: NaiveDate,
        slots: &[Slot],
        now: LocalNow,
    ) -> Result<Reservation, EngineError> {
        self.create(requester, None, studio, date, slots, Status::Pending, now)
            .await
    }

    /// Operator fast-book for walk-ins: lands directly as `confirmed`,
    /// unpaid, with a band name instead of a registered account.
    pub async fn fast_book(
        &self,
        requester: Requester,
        band_name: String,
        studio: StudioId,
        date: NaiveDate,
        slots: &[Slot],
        now: LocalNow,
    ) -> Result<Reservation, EngineError> {
        if band_name.trim().is_empty() {
            return Err(EngineError::Validation("band name is required"));
        }
        self.create(
            requester,
            Some(band_name),
            studio,
            date,
            slots,
            Status::Confirmed,
            now,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        requester: Requester,
        band_name: Option<String>,
        studio: StudioId,
        date: NaiveDate,
        slots: &[Slot],
        status: Status,
        now: LocalNow,
    ) -> Result<Reservation, EngineError> {
        validate_requester(&requester)?;
        let slots = validate_slots(slots)?;
        if date < now.date {
            return Err(EngineError::Validation("date is in the past"));
        }
        if date == now.date && slots[0].start_minute() <= now.minute {
            return Err(EngineError::Validation("first slot has already started"));
        }

        // Freshest snapshot for the target day; the check-then-write gap is
        // accepted and reconciled by the operator (last write wins).
        let day = self
            .store()
            .find(&ReservationFilter {
                studio: Some(studio),
                date: Some(date),
                ..Default::default()
            })
            .await
            .map_err(EngineError::from)?;
        if let Err(e) = check_no_conflict(&slots, &day, now.date) {
            metrics::counter!(observability::CONFLICTS_REJECTED_TOTAL).increment(1);
            return Err(e);
        }

        let reservation = Reservation {
            id: Ulid::new(),
            receipt_no: new_receipt_no(),
            requester,
            band_name,
            studio,
            date,
            slots,
            status,
            cancel_reason: None,
            paid: false,
            checked_in_at: None,
            checked_out_at: None,
            auto_checked_out: false,
            created_at: now.to_datetime(),
        };
        self.store()
            .create(reservation.clone())
            .await
            .map_err(EngineError::from)?;

        metrics::counter!(observability::RESERVATIONS_CREATED_TOTAL).increment(1);
        info!(
            id = %reservation.id,
            receipt = %reservation.receipt_no,
            studio = studio.name(),
            %date,
            slots = reservation.half_hours(),
            ?status,
            "reservation created"
        );
        Ok(reservation)
    }

    // ── Approval lifecycle ───────────────────────────────────

    /// Operator approves a pending request. Approving twice is a no-op.
    pub async fn approve(&self, id: Ulid) -> Result<Outcome, EngineError> {
        let r = self.fetch(id).await?;
        match r.status {
            Status::Confirmed => Ok(Outcome::NoOp),
            Status::Cancelled => Err(EngineError::Terminal(id)),
            Status::Pending => {
                self.write(
                    id,
                    Patch::SetStatus {
                        status: Status::Confirmed,
                        cancel_reason: None,
                    },
                )
                .await?;
                info!(%id, receipt = %r.receipt_no, "request approved");
                Ok(Outcome::Applied)
            }
        }
    }

    /// Operator declines a pending request.
    pub async fn reject(&self, id: Ulid) -> Result<Outcome, EngineError> {
        let r = self.fetch(id).await?;
        match r.status {
            Status::Cancelled => Ok(Outcome::NoOp),
            Status::Confirmed => Err(EngineError::Validation(
                "request is already confirmed; cancel it instead",
            )),
            Status::Pending => {
                self.cancel_with(id, CancelReason::Rejected).await?;
                info!(%id, "request rejected");
                Ok(Outcome::Applied)
            }
        }
    }

    /// Requester withdraws their own pending request.
    pub async fn withdraw(&self, id: Ulid, user_id: Ulid) -> Result<Outcome, EngineError> {
        let r = self.fetch(id).await?;
        if r.requester.user_id != user_id {
            return Err(EngineError::Validation("only the requester may withdraw"));
        }
        match r.status {
            Status::Cancelled => Ok(Outcome::NoOp),
            Status::Confirmed => Err(EngineError::Validation(
                "confirmed bookings are cancelled by an operator",
            )),
            Status::Pending => {
                self.cancel_with(id, CancelReason::Withdrawn).await?;
                info!(%id, "request withdrawn");
                Ok(Outcome::Applied)
            }
        }
    }

    /// Operator cancels a reservation in any non-terminal state.
    pub async fn cancel(&self, id: Ulid) -> Result<Outcome, EngineError> {
        let r = self.fetch(id).await?;
        if r.status == Status::Cancelled {
            return Ok(Outcome::NoOp);
        }
        self.cancel_with(id, CancelReason::Operator).await?;
        info!(%id, "reservation cancelled by operator");
        Ok(Outcome::Applied)
    }

    async fn cancel_with(&self, id: Ulid, reason: CancelReason) -> Result<(), EngineError> {
        self.write(
            id,
            Patch::SetStatus {
                status: Status::Cancelled,
                cancel_reason: Some(reason),
            },
        )
        .await
    }

    /// Payment flag, settable only on confirmed reservations.
    pub async fn set_paid(&self, id: Ulid, paid: bool) -> Result<Outcome, EngineError> {
        let r = self.fetch(id).await?;
        match r.status {
            Status::Cancelled => Err(EngineError::Terminal(id)),
            Status::Pending => Err(EngineError::Validation("request is not confirmed yet")),
            Status::Confirmed if r.paid == paid => Ok(Outcome::NoOp),
            Status::Confirmed => {
                self.write(id, Patch::SetPaid { paid }).await?;
                info!(%id, paid, "payment flag updated");
                Ok(Outcome::Applied)
            }
        }
    }

    // ── Presence ─────────────────────────────────────────────

    /// Kiosk self check-in. Admission checks run in a fixed order so the
    /// most specific message wins: wrong date, then session over, then too
    /// early, then past the grace window.
    pub async fn check_in(&self, id: Ulid, now: LocalNow) -> Result<Reservation, EngineError> {
        let r = self.fetch(id).await?;
        match r.status {
            Status::Cancelled => return Err(EngineError::Terminal(id)),
            Status::Pending => {
                return Err(EngineError::Validation("request has not been approved"))
            }
            Status::Confirmed => {}
        }

        let first = r
            .first_start_minute()
            .ok_or(EngineError::Validation("reservation has no slots"))?;
        let last_end = r.last_end_minute().unwrap_or(first);

        if r.date != now.date {
            return Err(EngineError::Admission(AdmissionError::WrongDate {
                booked: r.date,
            }));
        }
        if now.minute >= last_end {
            return Err(EngineError::Admission(AdmissionError::SessionEnded));
        }
        if now.minute < first {
            return Err(EngineError::Admission(AdmissionError::TooEarly {
                minutes_early: first - now.minute,
            }));
        }
        if now.minute > first + CHECK_IN_GRACE_MINUTES {
            return Err(EngineError::Admission(AdmissionError::TooLate {
                minutes_late: now.minute - first,
            }));
        }
        if r.checked_in_at.is_some() {
            return Err(EngineError::Validation("already checked in"));
        }

        self.write(
            id,
            Patch::SetCheckedIn {
                at: now.to_datetime(),
            },
        )
        .await?;
        info!(%id, receipt = %r.receipt_no, "checked in");
        self.fetch(id).await
    }

    /// Kiosk check-out. Checking out twice is a no-op; the monitor may race
    /// the kiosk at session end.
    pub async fn check_out(&self, id: Ulid, now: LocalNow) -> Result<Outcome, EngineError> {
        self.finish_session(id, now, false).await
    }

    // ── Monitor writes ───────────────────────────────────────

    /// Cancel a confirmed no-show. Already-cancelled is a no-op so the sweep
    /// can safely re-issue after a partial failure.
    pub async fn auto_cancel_no_show(&self, id: Ulid) -> Result<Outcome, EngineError> {
        let r = self.fetch(id).await?;
        match r.status {
            Status::Cancelled => Ok(Outcome::NoOp),
            Status::Pending => Err(EngineError::Validation("request is not confirmed")),
            Status::Confirmed => {
                if r.checked_in_at.is_some() {
                    // Arrived between snapshot and write; leave it alone.
                    return Ok(Outcome::NoOp);
                }
                self.cancel_with(id, CancelReason::NoShow).await?;
                info!(%id, receipt = %r.receipt_no, "no-show cancelled");
                Ok(Outcome::Applied)
            }
        }
    }

    /// Close out a session still checked in at its end time.
    pub async fn auto_check_out(&self, id: Ulid, now: LocalNow) -> Result<Outcome, EngineError> {
        self.finish_session(id, now, true).await
    }

    async fn finish_session(
        &self,
        id: Ulid,
        now: LocalNow,
        auto: bool,
    ) -> Result<Outcome, EngineError> {
        let r = self.fetch(id).await?;
        match r.presence() {
            Presence::CheckedOut => Ok(Outcome::NoOp),
            Presence::Waiting => Err(EngineError::Validation("not checked in")),
            Presence::CheckedIn => {
                if r.checked_in_at.is_some_and(|at| now.to_datetime() < at) {
                    return Err(EngineError::Validation("checkout precedes check-in"));
                }
                self.write(
                    id,
                    Patch::SetCheckedOut {
                        at: now.to_datetime(),
                        auto,
                    },
                )
                .await?;
                info!(%id, auto, "checked out");
                Ok(Outcome::Applied)
            }
        }
    }
}
