use std::collections::HashMap;

use ulid::Ulid;

use crate::model::{Reservation, Status};

/// Cumulative confirmed hours that earn one free live-recording session.
pub const PROMO_THRESHOLD_HOURS: u32 = 15;

/// All arithmetic runs in half-hour units so the modulo never touches
/// floating point; hours are converted only at the edge.
const THRESHOLD_HALF_HOURS: u32 = PROMO_THRESHOLD_HOURS * 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoyaltyStanding {
    pub total_hours: f64,
    pub promos_earned: u32,
    /// Hours accrued into the current (incomplete) threshold cycle.
    pub progress_in_cycle: f64,
    /// Hours left until the next promo.
    pub remaining: f64,
    /// Just crossed a threshold exactly: a promo is waiting to be redeemed.
    pub promo_ready: bool,
}

/// Accrual over one user's reservations. Counts every confirmed
/// reservation's booked hours, regardless of presence state; pending and
/// cancelled contribute nothing. Cancellation retroactively removes hours,
/// which is why this is recomputed from history on every read rather than
/// kept as a counter.
pub fn accrue(history: &[Reservation]) -> LoyaltyStanding {
    let half_hours: u32 = history
        .iter()
        .filter(|r| r.status == Status::Confirmed)
        .map(Reservation::half_hours)
        .sum();

    let promos_earned = half_hours / THRESHOLD_HALF_HOURS;
    let progress = half_hours % THRESHOLD_HALF_HOURS;

    LoyaltyStanding {
        total_hours: f64::from(half_hours) * 0.5,
        promos_earned,
        progress_in_cycle: f64::from(progress) * 0.5,
        remaining: f64::from(THRESHOLD_HALF_HOURS - progress) * 0.5,
        promo_ready: progress == 0 && promos_earned > 0,
    }
}

/// One row of the operator loyalty view.
#[derive(Debug, Clone, PartialEq)]
pub struct UserLoyalty {
    pub user_id: Ulid,
    pub name: String,
    pub standing: LoyaltyStanding,
}

/// Group a store snapshot by requester and rank by total hours, most first.
pub fn leaderboard(snapshot: &[Reservation]) -> Vec<UserLoyalty> {
    let mut by_user: HashMap<Ulid, Vec<Reservation>> = HashMap::new();
    for r in snapshot {
        by_user.entry(r.requester.user_id).or_default().push(r.clone());
    }

    let mut rows: Vec<UserLoyalty> = by_user
        .into_iter()
        .map(|(user_id, history)| {
            let name = history
                .iter()
                .max_by_key(|r| r.created_at)
                .map(|r| r.requester.name.clone())
                .unwrap_or_default();
            UserLoyalty {
                user_id,
                name,
                standing: accrue(&history),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.standing
            .total_hours
            .partial_cmp(&a.standing.total_hours)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::calendar::Slot;
    use crate::model::{new_receipt_no, Requester, StudioId};

    fn confirmed_hours(user: Ulid, name: &str, half_hours: usize) -> Reservation {
        Reservation {
            id: Ulid::new(),
            receipt_no: new_receipt_no(),
            requester: Requester {
                user_id: user,
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                phone: String::new(),
            },
            band_name: None,
            studio: StudioId::StudioA,
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            slots: (0..half_hours).map(|i| Slot::at(i).unwrap()).collect(),
            status: Status::Confirmed,
            cancel_reason: None,
            paid: true,
            checked_in_at: None,
            checked_out_at: None,
            auto_checked_out: false,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn crossing_the_threshold() {
        let user = Ulid::new();
        // 14.5 hours: one half-hour short of the first promo.
        let mut history = vec![confirmed_hours(user, "Ana", 29)];
        let before = accrue(&history);
        assert_eq!(before.total_hours, 14.5);
        assert_eq!(before.promos_earned, 0);
        assert_eq!(before.remaining, 0.5);
        assert!(!before.promo_ready);

        // One more hour: 15.5 total, threshold crossed.
        history.push(confirmed_hours(user, "Ana", 2));
        let after = accrue(&history);
        assert_eq!(after.total_hours, 15.5);
        assert_eq!(after.promos_earned, 1);
        assert_eq!(after.progress_in_cycle, 0.5);
        assert_eq!(after.remaining, 14.5);
        assert!(!after.promo_ready);
    }

    #[test]
    fn exact_threshold_is_promo_ready() {
        let user = Ulid::new();
        let history = vec![confirmed_hours(user, "Ana", 30)];
        let standing = accrue(&history);
        assert_eq!(standing.promos_earned, 1);
        assert_eq!(standing.progress_in_cycle, 0.0);
        assert!(standing.promo_ready);
    }

    #[test]
    fn only_confirmed_counts() {
        let user = Ulid::new();
        let mut pending = confirmed_hours(user, "Ana", 4);
        pending.status = Status::Pending;
        let mut cancelled = confirmed_hours(user, "Ana", 4);
        cancelled.status = Status::Cancelled;

        let standing = accrue(&[pending, cancelled, confirmed_hours(user, "Ana", 2)]);
        assert_eq!(standing.total_hours, 1.0);
    }

    #[test]
    fn cancellation_retroactively_removes_hours() {
        let user = Ulid::new();
        let mut history = vec![
            confirmed_hours(user, "Ana", 20),
            confirmed_hours(user, "Ana", 10),
        ];
        assert_eq!(accrue(&history).promos_earned, 1);

        history[1].status = Status::Cancelled;
        let standing = accrue(&history);
        assert_eq!(standing.promos_earned, 0);
        assert_eq!(standing.total_hours, 10.0);
    }

    #[test]
    fn leaderboard_ranks_by_hours() {
        let heavy = Ulid::new();
        let light = Ulid::new();
        let snapshot = vec![
            confirmed_hours(light, "Ben", 2),
            confirmed_hours(heavy, "Ana", 10),
            confirmed_hours(heavy, "Ana", 6),
        ];
        let rows = leaderboard(&snapshot);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user_id, heavy);
        assert_eq!(rows[0].standing.total_hours, 8.0);
        assert_eq!(rows[1].standing.total_hours, 1.0);
    }
}
