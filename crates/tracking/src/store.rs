use std::error::Error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    occupancy::Occupancy, station::Station, street::StreetLocation, Position,
    Scope,
};
use utility::id::Id;

use crate::{engine::ReconcileBatch, registry::StationBatch};

#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Unavailable(Box<dyn Error + Send + Sync>),
}

impl StoreError {
    pub fn unavailable<E: Error + Send + Sync + 'static>(why: E) -> Self {
        Self::Unavailable(Box::new(why))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One street location candidate returned by the spatial index, with its
/// distance from the queried position in meters.
#[derive(Debug, Clone)]
pub struct StreetCandidate {
    pub id: Id<StreetLocation>,
    pub distance_m: f64,
}

/// Nearest-neighbor queries against the base map. Candidates come back
/// ordered by ascending distance; the radius boundary is inclusive.
#[async_trait]
pub trait SpatialIndex: Send + Sync {
    async fn nearest_street_locations(
        &self,
        region: &str,
        position: Position,
        radius_m: f64,
        limit: u32,
    ) -> Result<Vec<StreetCandidate>>;
}

/// The persisted occupancy table. Mutated exclusively through `apply_batch`,
/// which executes under a single transaction so partial cycles are never
/// visible.
#[async_trait]
pub trait OccupancyStore: Send + Sync {
    /// All live rows for the scope. Rows are never deleted, so this is the
    /// complete set of identities ever observed there.
    async fn load_active(&self, scope: &Scope) -> Result<Vec<Occupancy>>;

    /// Apply one cycle's departures and park upserts, all or nothing.
    async fn apply_batch(&self, scope: &Scope, batch: &ReconcileBatch)
        -> Result<()>;

    /// Record street locations vacated inside the given window into the
    /// free-space log. Returns the number of log rows written.
    async fn record_freed_street_locations(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64>;
}

#[async_trait]
pub trait StationStore: Send + Sync {
    async fn stations_by_company(&self, company: &str) -> Result<Vec<Station>>;

    async fn apply_station_batch(&self, batch: &StationBatch) -> Result<()>;
}

/// Scope-scoped lease guarding one reconciliation cycle. Two concurrent
/// cycles for the same scope must never interleave their read-then-write
/// phases; holding the guard for the duration of the cycle enforces that.
/// Dropping the guard releases the lease.
#[async_trait]
pub trait ScopeLease: Send + Sync {
    type Guard: Send;

    /// `None` means another cycle currently holds the scope; the caller
    /// skips this invocation instead of queueing behind it.
    async fn try_acquire(&self, scope: &Scope) -> Result<Option<Self::Guard>>;
}
