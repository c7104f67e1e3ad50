use std::collections::HashSet;

use chrono::NaiveDate;

use crate::calendar::{self, Slot};
use crate::model::{Requester, Reservation};

use super::EngineError;

/// Union of slots currently held on one (studio, date) by any non-cancelled
/// reservation. Pending holds block exactly like confirmed ones; early
/// checkouts shrink their contribution via `effective_slots`.
pub(crate) fn occupied_slots(reservations: &[Reservation], today: NaiveDate) -> HashSet<Slot> {
    reservations
        .iter()
        .filter(|r| r.is_active())
        .flat_map(|r| r.effective_slots(today))
        .collect()
}

/// Reject a requested slot set if any member is already held. The error
/// names the first clashing slot in catalog order so the caller can point at
/// it.
pub(crate) fn check_no_conflict(
    requested: &[Slot],
    reservations: &[Reservation],
    today: NaiveDate,
) -> Result<(), EngineError> {
    let occupied = occupied_slots(reservations, today);
    for slot in requested {
        if occupied.contains(slot) {
            return Err(EngineError::Conflict { slot: *slot });
        }
    }
    Ok(())
}

/// Normalize a requested slot set: non-empty, deduplicated, sorted into
/// catalog order, and contiguous. Everything downstream (end time, admission
/// window, conflict check) relies on this having run.
pub(crate) fn validate_slots(slots: &[Slot]) -> Result<Vec<Slot>, EngineError> {
    if slots.is_empty() {
        return Err(EngineError::Validation("no slots selected"));
    }
    let mut sorted = slots.to_vec();
    calendar::sort_slots(&mut sorted);
    sorted.dedup();
    if !calendar::is_contiguous(&sorted) {
        return Err(EngineError::Validation("slots must be contiguous"));
    }
    Ok(sorted)
}

pub(crate) fn validate_requester(requester: &Requester) -> Result<(), EngineError> {
    if requester.name.trim().is_empty() {
        return Err(EngineError::Validation("requester name is required"));
    }
    if requester.email.trim().is_empty() {
        return Err(EngineError::Validation("requester email is required"));
    }
    Ok(())
}
