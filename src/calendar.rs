use std::fmt;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Minutes since local midnight — the only clock unit the engine reasons in.
pub type Minute = u16;

/// First bookable slot starts at 08:00.
pub const OPEN_MINUTE: Minute = 8 * 60;
/// Last bookable slot starts at 22:30 (doors close at 23:00).
pub const LAST_SLOT_MINUTE: Minute = 22 * 60 + 30;
/// Every slot is exactly 30 minutes.
pub const SLOT_MINUTES: Minute = 30;
/// 08:00 through 22:30 inclusive, step 30.
pub const SLOT_COUNT: usize = 30;

/// A fixed 30-minute bookable time unit, identified by its start minute.
///
/// Slots are compared by minute only; the 12-hour label ("8:00 AM") is a
/// display/storage format. All slot arithmetic in the crate goes through
/// this module — callers never do their own minute math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slot(Minute);

impl Slot {
    /// Construct from a start minute. Returns `None` unless the minute is on
    /// the catalog grid and within opening hours.
    pub fn from_start_minute(minute: Minute) -> Option<Slot> {
        if minute < OPEN_MINUTE || minute > LAST_SLOT_MINUTE {
            return None;
        }
        if (minute - OPEN_MINUTE) % SLOT_MINUTES != 0 {
            return None;
        }
        Some(Slot(minute))
    }

    /// The `index`-th slot of the day (0 = 08:00, 29 = 22:30).
    pub fn at(index: usize) -> Option<Slot> {
        if index >= SLOT_COUNT {
            return None;
        }
        Some(Slot(OPEN_MINUTE + index as Minute * SLOT_MINUTES))
    }

    pub fn start_minute(self) -> Minute {
        self.0
    }

    pub fn end_minute(self) -> Minute {
        self.0 + SLOT_MINUTES
    }

    /// Position in the catalog order.
    pub fn index(self) -> usize {
        ((self.0 - OPEN_MINUTE) / SLOT_MINUTES) as usize
    }

    /// Parse a 12-hour label like "8:00 AM" or "10:30 PM".
    pub fn parse(label: &str) -> Option<Slot> {
        let (time, period) = label.trim().split_once(' ')?;
        let (h, m) = time.split_once(':')?;
        let hour: u16 = h.parse().ok()?;
        let minute: u16 = m.parse().ok()?;
        if hour == 0 || hour > 12 || minute >= 60 {
            return None;
        }
        let hour24 = match period {
            "AM" if hour == 12 => 0,
            "AM" => hour,
            "PM" if hour == 12 => 12,
            "PM" => hour + 12,
            _ => return None,
        };
        Slot::from_start_minute(hour24 * 60 + minute)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&minute_label(self.0))
    }
}

/// 12-hour label for any minute-of-day ("11:00 PM" for 1380). Used for slot
/// display and for session-end times, which fall past the last slot start.
pub fn minute_label(minute: Minute) -> String {
    let (hour24, m) = (minute / 60, minute % 60);
    let (hour12, period) = match hour24 {
        0 | 24 => (12, "AM"),
        1..=11 => (hour24, "AM"),
        12 => (12, "PM"),
        _ => (hour24 - 12, "PM"),
    };
    format!("{hour12}:{m:02} {period}")
}

impl TryFrom<String> for Slot {
    type Error = String;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        Slot::parse(&label).ok_or_else(|| format!("not a catalog slot: {label:?}"))
    }
}

impl From<Slot> for String {
    fn from(slot: Slot) -> String {
        slot.to_string()
    }
}

/// The full catalog in order. Identical for every studio and every date.
pub fn catalog() -> impl Iterator<Item = Slot> {
    (0..SLOT_COUNT).map(|i| Slot(OPEN_MINUTE + i as Minute * SLOT_MINUTES))
}

/// Slots covering `[a.start, b.start)` — inclusive of `a`, exclusive of `b`.
/// Empty when `b` does not come after `a`.
pub fn slots_between(a: Slot, b: Slot) -> Vec<Slot> {
    catalog()
        .filter(|s| s.start_minute() >= a.start_minute() && s.start_minute() < b.start_minute())
        .collect()
}

/// Sort a slot list into catalog order. Every derived computation (end time,
/// conflict check, admission window) requires this to have happened first.
pub fn sort_slots(slots: &mut [Slot]) {
    slots.sort_by_key(|s| s.start_minute());
}

/// True when the sorted list is a single unbroken run of 30-minute slots.
pub fn is_contiguous(sorted: &[Slot]) -> bool {
    sorted
        .windows(2)
        .all(|w| w[1].start_minute() == w[0].end_minute())
}

// ── Wall-clock instants ───────────────────────────────────

/// A local calendar day plus minute-of-day. Every time-sensitive operation
/// takes one of these explicitly, so tests can simulate any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNow {
    pub date: NaiveDate,
    pub minute: Minute,
}

impl LocalNow {
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self {
            date: dt.date(),
            minute: minute_of(&dt),
        }
    }

    /// The same instant as a `NaiveDateTime`, for stamping presence fields.
    pub fn to_datetime(self) -> NaiveDateTime {
        self.date
            .and_hms_opt(u32::from(self.minute / 60), u32::from(self.minute % 60), 0)
            .expect("minute-of-day is always a valid time")
    }
}

/// Minute-of-day of a datetime, seconds discarded.
pub fn minute_of(dt: &NaiveDateTime) -> Minute {
    (dt.hour() * 60 + dt.minute()) as Minute
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_shape() {
        let slots: Vec<Slot> = catalog().collect();
        assert_eq!(slots.len(), SLOT_COUNT);
        assert_eq!(slots[0].start_minute(), 480); // 8:00 AM
        assert_eq!(slots[29].start_minute(), 1350); // 10:30 PM
        assert_eq!(slots[29].end_minute(), 1380); // closes 11:00 PM
        for (i, s) in slots.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn display_uses_twelve_hour_labels() {
        assert_eq!(Slot::from_start_minute(480).unwrap().to_string(), "8:00 AM");
        assert_eq!(Slot::from_start_minute(690).unwrap().to_string(), "11:30 AM");
        assert_eq!(Slot::from_start_minute(720).unwrap().to_string(), "12:00 PM");
        assert_eq!(Slot::from_start_minute(750).unwrap().to_string(), "12:30 PM");
        assert_eq!(Slot::from_start_minute(780).unwrap().to_string(), "1:00 PM");
        assert_eq!(Slot::from_start_minute(1350).unwrap().to_string(), "10:30 PM");
    }

    #[test]
    fn parse_roundtrip_whole_catalog() {
        for slot in catalog() {
            assert_eq!(Slot::parse(&slot.to_string()), Some(slot));
        }
    }

    #[test]
    fn parse_rejects_off_catalog() {
        assert_eq!(Slot::parse("7:30 AM"), None); // before opening
        assert_eq!(Slot::parse("11:00 PM"), None); // after last slot
        assert_eq!(Slot::parse("8:15 AM"), None); // off the grid
        assert_eq!(Slot::parse("8:00"), None);
        assert_eq!(Slot::parse("garbage"), None);
    }

    #[test]
    fn from_start_minute_bounds() {
        assert!(Slot::from_start_minute(479).is_none());
        assert!(Slot::from_start_minute(480).is_some());
        assert!(Slot::from_start_minute(495).is_none());
        assert!(Slot::from_start_minute(1350).is_some());
        assert!(Slot::from_start_minute(1380).is_none());
    }

    #[test]
    fn slots_between_inclusive_exclusive() {
        let nine = Slot::parse("9:00 AM").unwrap();
        let ten = Slot::parse("10:00 AM").unwrap();
        let between = slots_between(nine, ten);
        assert_eq!(between.len(), 2);
        assert_eq!(between[0], nine);
        assert_eq!(between[1], Slot::parse("9:30 AM").unwrap());

        assert!(slots_between(ten, nine).is_empty());
        assert!(slots_between(nine, nine).is_empty());
    }

    #[test]
    fn contiguity() {
        let run: Vec<Slot> = slots_between(
            Slot::parse("9:00 AM").unwrap(),
            Slot::parse("11:00 AM").unwrap(),
        );
        assert!(is_contiguous(&run));

        let gap = vec![
            Slot::parse("9:00 AM").unwrap(),
            Slot::parse("10:00 AM").unwrap(),
        ];
        assert!(!is_contiguous(&gap));

        assert!(is_contiguous(&[Slot::parse("8:00 AM").unwrap()]));
        assert!(is_contiguous(&[]));
    }

    #[test]
    fn sort_restores_catalog_order() {
        let mut slots = vec![
            Slot::parse("10:00 AM").unwrap(),
            Slot::parse("8:30 AM").unwrap(),
            Slot::parse("9:00 AM").unwrap(),
        ];
        sort_slots(&mut slots);
        assert_eq!(slots[0].start_minute(), 510);
        assert_eq!(slots[2].start_minute(), 600);
    }

    #[test]
    fn local_now_minute_math() {
        let dt = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(14, 40, 59)
            .unwrap();
        let now = LocalNow::from_datetime(dt);
        assert_eq!(now.minute, 14 * 60 + 40);
        assert_eq!(now.to_datetime().time().format("%H:%M").to_string(), "14:40");
    }

    #[test]
    fn slot_serde_uses_labels() {
        #[derive(Serialize, Deserialize)]
        struct Doc {
            slot: Slot,
        }
        // serde(into/try_from = String) keeps the document-store format
        // byte-compatible with the 12-hour labels.
        let slot = Slot::parse("2:30 PM").unwrap();
        let s: String = slot.into();
        assert_eq!(s, "2:30 PM");
        assert_eq!(Slot::try_from("2:30 PM".to_string()).unwrap(), slot);
        assert!(Slot::try_from("25:00 XX".to_string()).is_err());
    }
}
