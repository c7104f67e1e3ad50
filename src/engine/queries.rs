use chrono::NaiveDate;
use ulid::Ulid;

use crate::calendar::{LocalNow, Slot};
use crate::model::{Presence, Reservation, ReservationFilter, Status, StudioId, STUDIOS};

use super::availability::{resolve_day, SlotStatus};
use super::{Engine, EngineError};

/// One studio's live presence picture for the operator floor view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioActivity {
    pub studio: StudioId,
    /// Checked in, not yet out.
    pub in_studio: Vec<Reservation>,
    /// Finished (manually or auto checked out).
    pub done: Vec<Reservation>,
    /// Confirmed for today, not yet arrived, ordered by start time.
    pub waiting: Vec<Reservation>,
}

impl Engine {
    pub async fn reservations(
        &self,
        filter: &ReservationFilter,
    ) -> Result<Vec<Reservation>, EngineError> {
        self.store().find(filter).await.map_err(EngineError::from)
    }

    /// Kiosk lookup by receipt code, exact match.
    pub async fn find_by_receipt(&self, code: &str) -> Result<Reservation, EngineError> {
        let mut hits = self
            .reservations(&ReservationFilter {
                receipt_no: Some(code.to_string()),
                ..Default::default()
            })
            .await?;
        hits.pop()
            .ok_or_else(|| EngineError::UnknownReceipt(code.to_string()))
    }

    /// Slot classification for one (studio, date) as seen by `viewer`.
    pub async fn availability(
        &self,
        studio: StudioId,
        date: NaiveDate,
        viewer: Ulid,
        now: LocalNow,
    ) -> Result<Vec<(Slot, SlotStatus)>, EngineError> {
        let day = self
            .reservations(&ReservationFilter {
                studio: Some(studio),
                date: Some(date),
                ..Default::default()
            })
            .await?;
        Ok(resolve_day(&day, viewer, date, now))
    }

    /// A requester's full history, newest first. Cancelled included.
    pub async fn user_history(&self, user_id: Ulid) -> Result<Vec<Reservation>, EngineError> {
        self.reservations(&ReservationFilter {
            user_id: Some(user_id),
            ..Default::default()
        })
        .await
    }

    /// Loyalty standing recomputed from the user's full history.
    pub async fn loyalty_of(&self, user_id: Ulid) -> Result<super::LoyaltyStanding, EngineError> {
        Ok(super::accrue(&self.user_history(user_id).await?))
    }

    /// Loyalty leaderboard across every requester on record.
    pub async fn loyalty_leaderboard(&self) -> Result<Vec<super::UserLoyalty>, EngineError> {
        Ok(super::leaderboard(
            &self.reservations(&ReservationFilter::default()).await?,
        ))
    }

    /// The operator review queue.
    pub async fn pending_requests(&self) -> Result<Vec<Reservation>, EngineError> {
        self.reservations(&ReservationFilter {
            status: Some(Status::Pending),
            ..Default::default()
        })
        .await
    }

    /// Per-studio presence rollup for today's confirmed sessions.
    pub async fn studio_activity(
        &self,
        now: LocalNow,
    ) -> Result<Vec<StudioActivity>, EngineError> {
        let today = self
            .reservations(&ReservationFilter {
                date: Some(now.date),
                status: Some(Status::Confirmed),
                ..Default::default()
            })
            .await?;

        Ok(STUDIOS
            .iter()
            .map(|studio| {
                let mut activity = StudioActivity {
                    studio: studio.id,
                    in_studio: Vec::new(),
                    done: Vec::new(),
                    waiting: Vec::new(),
                };
                for r in today.iter().filter(|r| r.studio == studio.id) {
                    match r.presence() {
                        Presence::CheckedIn => activity.in_studio.push(r.clone()),
                        Presence::CheckedOut => activity.done.push(r.clone()),
                        Presence::Waiting => activity.waiting.push(r.clone()),
                    }
                }
                activity
                    .waiting
                    .sort_by_key(|r| r.first_start_minute().unwrap_or(u16::MAX));
                activity
            })
            .collect())
    }
}
