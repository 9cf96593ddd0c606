//! ==============================================================================
//! cache.rs - single-slot store for the latest reading and its insight
//! ==============================================================================
//!
//! purpose:
//!     holds exactly one snapshot: the last accepted reading, the insight
//!     generated for it, and when it was committed. owned by the server state
//!     and handed to both endpoint handlers.
//!
//! atomicity:
//!     the slot is an Option<Snapshot> behind a tokio RwLock. a commit swaps
//!     the whole Option under the write lock and stamps the time while holding
//!     it, so commit order and timestamp order agree and a reader can never
//!     see fields from two different commits.
//!
//! ==============================================================================

use crate::domain::SensorReading;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// one committed reading/insight pair
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub reading: SensorReading,
    pub insight: String,
    pub timestamp: DateTime<Utc>,
}

/// cheap-to-clone handle to the shared slot
#[derive(Clone, Default)]
pub struct LatestReadingStore {
    slot: Arc<RwLock<Option<Snapshot>>>,
}

impl LatestReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// replace the slot with a new snapshot stamped now; returns what was stored
    pub async fn commit(&self, reading: SensorReading, insight: String) -> Snapshot {
        let mut guard = self.slot.write().await;
        let snapshot = Snapshot {
            reading,
            insight,
            timestamp: Utc::now(),
        };
        *guard = Some(snapshot.clone());
        snapshot
    }

    /// copy of the current snapshot, None until the first commit
    pub async fn latest(&self) -> Option<Snapshot> {
        self.slot.read().await.clone()
    }
}
