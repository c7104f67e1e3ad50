//! The booking engine: validation, conflict admission, lifecycle
//! transitions, and queries over a [`store::ReservationStore`].

mod availability;
mod conflict;
mod error;
mod loyalty;
mod mutations;
mod queries;
pub mod store;

pub use availability::{resolve_day, SlotStatus};
pub use error::{AdmissionError, EngineError};
pub use loyalty::{accrue, leaderboard, LoyaltyStanding, UserLoyalty, PROMO_THRESHOLD_HOURS};
pub use mutations::CHECK_IN_GRACE_MINUTES;
pub use queries::StudioActivity;

use std::sync::Arc;

use ulid::Ulid;

use crate::model::{Patch, Reservation};
use crate::notify::AlertHub;
use store::{ReservationStore, StoreError};

/// Whether a mutation changed anything. Retried and raced calls resolve to
/// `NoOp` instead of failing, so sweep logic stays idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    NoOp,
}

pub struct Engine {
    store: Arc<dyn ReservationStore>,
    alerts: Arc<AlertHub>,
}

impl Engine {
    pub fn new(store: Arc<dyn ReservationStore>, alerts: Arc<AlertHub>) -> Self {
        Self { store, alerts }
    }

    pub fn alerts(&self) -> &AlertHub {
        &self.alerts
    }

    pub fn store(&self) -> &Arc<dyn ReservationStore> {
        &self.store
    }

    pub(crate) async fn fetch(&self, id: Ulid) -> Result<Reservation, EngineError> {
        self.store
            .get(id)
            .await
            .map_err(EngineError::from)?
            .ok_or(EngineError::NotFound(id))
    }

    pub(crate) async fn write(&self, id: Ulid, patch: Patch) -> Result<(), EngineError> {
        self.store.update(id, patch).await.map_err(EngineError::from)
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            StoreError::AlreadyExists(id) => {
                EngineError::Store(format!("duplicate document {id}"))
            }
            StoreError::Unavailable(msg) => EngineError::Store(msg),
        }
    }
}
