use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::calendar::{self, Minute, Slot};

/// Flat per-slot rate, identical for every studio.
pub const RATE_PER_SLOT: u32 = 125;
pub const RATE_PER_HOUR: u32 = RATE_PER_SLOT * 2;

// ── Studios ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudioId {
    StudioA,
    StudioB,
    StudioC,
}

pub struct Studio {
    pub id: StudioId,
    pub name: &'static str,
    pub description: &'static str,
    pub location: &'static str,
}

pub const STUDIOS: [Studio; 3] = [
    Studio {
        id: StudioId::StudioA,
        name: "Studio A",
        description: "Perfect for solo artists and small groups",
        location: "Floor 1",
    },
    Studio {
        id: StudioId::StudioB,
        name: "Studio B",
        description: "Ideal for bands and larger productions",
        location: "Floor 2",
    },
    Studio {
        id: StudioId::StudioC,
        name: "Studio C",
        description: "Premium acoustics for professional recording",
        location: "Floor 3",
    },
];

impl StudioId {
    pub fn info(self) -> &'static Studio {
        match self {
            StudioId::StudioA => &STUDIOS[0],
            StudioId::StudioB => &STUDIOS[1],
            StudioId::StudioC => &STUDIOS[2],
        }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

// ── Lifecycle enums ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Confirmed,
    /// Terminal. No lifecycle field may change after this.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CancelReason {
    /// Never checked in within the grace window; cancelled by the monitor.
    NoShow,
    /// Operator declined the pending request.
    Rejected,
    /// Requester withdrew their own pending request.
    Withdrawn,
    /// Operator cancelled a confirmed reservation.
    Operator,
}

/// Physical-presence state, distinct from approval status and only
/// meaningful for confirmed reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Presence {
    Waiting,
    CheckedIn,
    CheckedOut,
}

// ── Reservation ──────────────────────────────────────────

/// Who booked, denormalized onto the reservation the way the document store
/// keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: Ulid,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// The central entity: a contiguous run of slots for one studio and date,
/// tracked through approval (`status`) and presence (check-in/out)
/// lifecycles. Reservations are never deleted; cancellation is a status
/// transition, preserving history for loyalty accrual and audit views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    /// Human-readable code shown at the kiosk, unique per reservation.
    pub receipt_no: String,
    pub requester: Requester,
    /// Set by the operator fast-book path.
    pub band_name: Option<String>,
    pub studio: StudioId,
    pub date: NaiveDate,
    /// Sorted by catalog order and contiguous; enforced at creation.
    pub slots: Vec<Slot>,
    pub status: Status,
    pub cancel_reason: Option<CancelReason>,
    pub paid: bool,
    pub checked_in_at: Option<NaiveDateTime>,
    pub checked_out_at: Option<NaiveDateTime>,
    pub auto_checked_out: bool,
    pub created_at: NaiveDateTime,
}

impl Reservation {
    pub fn half_hours(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn hours(&self) -> f64 {
        self.slots.len() as f64 * 0.5
    }

    pub fn amount(&self) -> u32 {
        self.slots.len() as u32 * RATE_PER_SLOT
    }

    /// Start minute of the session. `None` only for an (invalid) empty slot
    /// list; computed by min so unsorted store data can't skew it.
    pub fn first_start_minute(&self) -> Option<Minute> {
        self.slots.iter().map(|s| s.start_minute()).min()
    }

    /// End minute of the session (last slot start + 30).
    pub fn last_end_minute(&self) -> Option<Minute> {
        self.slots.iter().map(|s| s.end_minute()).max()
    }

    pub fn presence(&self) -> Presence {
        if self.checked_out_at.is_some() {
            Presence::CheckedOut
        } else if self.checked_in_at.is_some() {
            Presence::CheckedIn
        } else {
            Presence::Waiting
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != Status::Cancelled
    }

    /// The slots this reservation actually occupies right now. A confirmed
    /// reservation checked out early on its booking date frees every slot
    /// whose start is at or past the checkout minute — without mutating the
    /// stored list, so this must be recomputed on every resolve.
    pub fn effective_slots(&self, today: NaiveDate) -> Vec<Slot> {
        match self.checked_out_at {
            Some(out) if self.status == Status::Confirmed && self.date == today => {
                let cutoff = calendar::minute_of(&out);
                self.slots
                    .iter()
                    .copied()
                    .filter(|s| s.start_minute() < cutoff)
                    .collect()
            }
            _ => self.slots.clone(),
        }
    }

    /// "9:00 AM – 11:00 AM", for operator alerts.
    pub fn time_range_label(&self) -> String {
        match (self.first_start_minute(), self.last_end_minute()) {
            (Some(start), Some(end)) => format!(
                "{} – {}",
                calendar::minute_label(start),
                calendar::minute_label(end)
            ),
            _ => String::new(),
        }
    }
}

/// Receipt code: prefix, creation-ms tail, two alphanumeric chars. The ulid
/// tail stands in for a separate RNG.
pub fn new_receipt_no() -> String {
    let millis = Utc::now().timestamp_millis();
    let ulid = Ulid::new().to_string();
    format!("BL-{:06}{}", millis % 1_000_000, &ulid[ulid.len() - 2..])
}

// ── Store-facing types ───────────────────────────────────

/// Conjunction of equality filters, mirroring the document store's
/// query-by-equality surface. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    pub studio: Option<StudioId>,
    pub date: Option<NaiveDate>,
    pub status: Option<Status>,
    pub user_id: Option<Ulid>,
    pub receipt_no: Option<String>,
}

impl ReservationFilter {
    pub fn matches(&self, r: &Reservation) -> bool {
        self.studio.is_none_or(|s| r.studio == s)
            && self.date.is_none_or(|d| r.date == d)
            && self.status.is_none_or(|s| r.status == s)
            && self.user_id.is_none_or(|u| r.requester.user_id == u)
            && self
                .receipt_no
                .as_ref()
                .is_none_or(|code| &r.receipt_no == code)
    }
}

/// Atomic single-document field updates — the only writes the store accepts
/// besides create. Each maps to one `updateDoc`-style patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Patch {
    SetStatus {
        status: Status,
        cancel_reason: Option<CancelReason>,
    },
    SetCheckedIn {
        at: NaiveDateTime,
    },
    SetCheckedOut {
        at: NaiveDateTime,
        auto: bool,
    },
    SetPaid {
        paid: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(label: &str) -> Slot {
        Slot::parse(label).unwrap()
    }

    fn reservation(slots: &[&str]) -> Reservation {
        Reservation {
            id: Ulid::new(),
            receipt_no: new_receipt_no(),
            requester: Requester {
                user_id: Ulid::new(),
                name: "Ana Reyes".into(),
                email: "ana@example.com".into(),
                phone: "0917 000 0000".into(),
            },
            band_name: None,
            studio: StudioId::StudioA,
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            slots: slots.iter().map(|s| slot(s)).collect(),
            status: Status::Confirmed,
            cancel_reason: None,
            paid: false,
            checked_in_at: None,
            checked_out_at: None,
            auto_checked_out: false,
            created_at: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn derived_economics() {
        let r = reservation(&["9:00 AM", "9:30 AM", "10:00 AM"]);
        assert_eq!(r.half_hours(), 3);
        assert_eq!(r.hours(), 1.5);
        assert_eq!(r.amount(), 375);
    }

    #[test]
    fn session_bounds_survive_unsorted_data() {
        let r = reservation(&["10:00 AM", "9:00 AM", "9:30 AM"]);
        assert_eq!(r.first_start_minute(), Some(540));
        assert_eq!(r.last_end_minute(), Some(630));
        assert_eq!(r.time_range_label(), "9:00 AM – 10:30 AM");
    }

    #[test]
    fn presence_progression() {
        let mut r = reservation(&["9:00 AM"]);
        assert_eq!(r.presence(), Presence::Waiting);
        r.checked_in_at = r.date.and_hms_opt(9, 5, 0);
        assert_eq!(r.presence(), Presence::CheckedIn);
        r.checked_out_at = r.date.and_hms_opt(9, 25, 0);
        assert_eq!(r.presence(), Presence::CheckedOut);
    }

    #[test]
    fn effective_slots_shrink_after_early_checkout() {
        let mut r = reservation(&["10:00 AM", "10:30 AM", "11:00 AM"]);
        r.checked_in_at = r.date.and_hms_opt(10, 2, 0);
        r.checked_out_at = r.date.and_hms_opt(10, 40, 0);

        let kept = r.effective_slots(r.date);
        assert_eq!(kept, vec![slot("10:00 AM"), slot("10:30 AM")]);

        // Other dates keep the full list (historical views).
        let other_day = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        assert_eq!(r.effective_slots(other_day).len(), 3);
    }

    #[test]
    fn effective_slots_untouched_without_checkout() {
        let r = reservation(&["10:00 AM", "10:30 AM"]);
        assert_eq!(r.effective_slots(r.date).len(), 2);
    }

    #[test]
    fn cancelled_reservation_does_not_shrink() {
        let mut r = reservation(&["10:00 AM", "10:30 AM"]);
        r.status = Status::Cancelled;
        r.checked_out_at = r.date.and_hms_opt(10, 10, 0);
        assert_eq!(r.effective_slots(r.date).len(), 2);
    }

    #[test]
    fn filter_conjunction() {
        let r = reservation(&["9:00 AM"]);
        let hit = ReservationFilter {
            studio: Some(StudioId::StudioA),
            date: Some(r.date),
            status: Some(Status::Confirmed),
            ..Default::default()
        };
        assert!(hit.matches(&r));

        let miss = ReservationFilter {
            studio: Some(StudioId::StudioB),
            ..hit.clone()
        };
        assert!(!miss.matches(&r));

        let by_receipt = ReservationFilter {
            receipt_no: Some(r.receipt_no.clone()),
            ..Default::default()
        };
        assert!(by_receipt.matches(&r));
        assert!(ReservationFilter::default().matches(&r));
    }

    #[test]
    fn receipt_no_shape() {
        let code = new_receipt_no();
        assert!(code.starts_with("BL-"));
        assert_eq!(code.len(), 11);
    }
}
