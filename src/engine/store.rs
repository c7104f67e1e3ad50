use std::fmt;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::{Patch, Reservation, ReservationFilter};

/// Snapshot feed buffer. Consumers that lag get `RecvError::Lagged` and pick
/// up from the freshest snapshot, which is always self-contained.
const FEED_CAPACITY: usize = 256;

/// Everything a reader needs in one message: the full current collection.
/// Delta computation is the subscriber's job (`notify::DeltaNotifier`).
pub type Snapshot = Vec<Reservation>;

#[derive(Debug)]
pub enum StoreError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// Transient; callers retry or surface as retryable.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "no document {id}"),
            StoreError::AlreadyExists(id) => write!(f, "document {id} already exists"),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The collaborator seam: a document store with atomic single-document
/// writes, equality-filtered reads, and a pushed full-snapshot feed. The
/// engine never assumes multi-document transactions exist.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Atomic create of one document. Fails if the id is taken.
    async fn create(&self, reservation: Reservation) -> Result<(), StoreError>;

    /// Atomic field update of one document. Last write wins per document.
    async fn update(&self, id: Ulid, patch: Patch) -> Result<(), StoreError>;

    async fn get(&self, id: Ulid) -> Result<Option<Reservation>, StoreError>;

    /// All documents matching the filter conjunction, newest first.
    async fn find(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, StoreError>;

    /// Full-collection snapshot after every committed write.
    fn subscribe(&self) -> broadcast::Receiver<Snapshot>;
}

/// Reference store: a `DashMap` keyed by reservation id plus a broadcast
/// feed. Good for tests and single-process deployments.
pub struct InMemoryStore {
    documents: DashMap<Ulid, Reservation>,
    feed: broadcast::Sender<Snapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            documents: DashMap::new(),
            feed,
        }
    }

    /// Newest first, id as tiebreaker so snapshots are deterministic.
    fn snapshot(&self) -> Snapshot {
        let mut all: Vec<Reservation> = self.documents.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        all
    }

    fn publish(&self) {
        // No receivers is fine; the feed is best-effort.
        let _ = self.feed.send(self.snapshot());
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply(reservation: &mut Reservation, patch: &Patch) {
    match patch {
        Patch::SetStatus {
            status,
            cancel_reason,
        } => {
            reservation.status = *status;
            reservation.cancel_reason = *cancel_reason;
        }
        Patch::SetCheckedIn { at } => reservation.checked_in_at = Some(*at),
        Patch::SetCheckedOut { at, auto } => {
            reservation.checked_out_at = Some(*at);
            reservation.auto_checked_out = *auto;
        }
        Patch::SetPaid { paid } => reservation.paid = *paid,
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn create(&self, reservation: Reservation) -> Result<(), StoreError> {
        let id = reservation.id;
        match self.documents.entry(id) {
            Entry::Occupied(_) => return Err(StoreError::AlreadyExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(reservation);
            }
        }
        self.publish();
        Ok(())
    }

    async fn update(&self, id: Ulid, patch: Patch) -> Result<(), StoreError> {
        {
            let mut entry = self.documents.get_mut(&id).ok_or(StoreError::NotFound(id))?;
            apply(entry.value_mut(), &patch);
        }
        self.publish();
        Ok(())
    }

    async fn get(&self, id: Ulid) -> Result<Option<Reservation>, StoreError> {
        Ok(self.documents.get(&id).map(|e| e.value().clone()))
    }

    async fn find(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, StoreError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.feed.subscribe()
    }
}
