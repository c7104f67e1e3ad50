use std::collections::HashSet;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::calendar::{self, LocalNow, Slot};
use crate::model::{Reservation, Status};

/// What one catalog slot looks like to one viewer on one (studio, date).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Free,
    /// Held by the viewer themself, pending or confirmed.
    Mine,
    /// Confirmed by someone else.
    Taken,
    /// Pending request by someone else; blocks exactly like `Taken`.
    PendingOther,
    /// Unreserved, but its start time has already passed today.
    Past,
}

impl SlotStatus {
    /// Whether the viewer may anchor or extend a selection here.
    pub fn selectable(self) -> bool {
        self == SlotStatus::Free
    }
}

/// Classify every catalog slot for one (studio, date) as seen by `viewer`.
///
/// `reservations` is the store snapshot for that studio and date; cancelled
/// entries are ignored, confirmed entries contribute their effective slots
/// (early checkout frees the tail on the booking day), and the viewer's own
/// holds win over every other classification. `Past` applies only to
/// unreserved slots, only when the resolved date is today.
pub fn resolve_day(
    reservations: &[Reservation],
    viewer: Ulid,
    date: NaiveDate,
    now: LocalNow,
) -> Vec<(Slot, SlotStatus)> {
    let mut mine: HashSet<Slot> = HashSet::new();
    let mut taken: HashSet<Slot> = HashSet::new();
    let mut pending_other: HashSet<Slot> = HashSet::new();

    for r in reservations.iter().filter(|r| r.is_active()) {
        let is_mine = r.requester.user_id == viewer;
        match r.status {
            Status::Confirmed => {
                let slots = r.effective_slots(now.date);
                if is_mine {
                    mine.extend(slots);
                } else {
                    taken.extend(slots);
                }
            }
            Status::Pending => {
                if is_mine {
                    mine.extend(r.slots.iter().copied());
                } else {
                    pending_other.extend(r.slots.iter().copied());
                }
            }
            Status::Cancelled => {}
        }
    }

    let is_today = date == now.date;
    calendar::catalog()
        .map(|slot| {
            let status = if mine.contains(&slot) {
                SlotStatus::Mine
            } else if taken.contains(&slot) {
                SlotStatus::Taken
            } else if pending_other.contains(&slot) {
                SlotStatus::PendingOther
            } else if is_today && slot.start_minute() <= now.minute {
                SlotStatus::Past
            } else {
                SlotStatus::Free
            };
            (slot, status)
        })
        .collect()
}
