use std::time::Duration;

use chrono::Utc;
use model::Scope;
use tokio::time::timeout;

use crate::{
    engine::{CycleReport, ReconciliationEngine},
    fleet::StationDirectory,
    provider::{ProviderError, SnapshotProvider},
    registry,
    store::{OccupancyStore, ScopeLease, SpatialIndex, StationStore, StoreError},
};

#[derive(Debug)]
pub enum CycleError {
    Provider(ProviderError),
    Store(StoreError),
    /// The external fetch did not finish inside the bound. Nothing was
    /// written: reconciling partial data would wrongly mark unfetched
    /// assets as departed.
    FetchTimeout,
    /// Another cycle currently holds this scope; skipped, not queued.
    LockContention,
}

impl From<ProviderError> for CycleError {
    fn from(why: ProviderError) -> Self {
        Self::Provider(why)
    }
}

impl From<StoreError> for CycleError {
    fn from(why: StoreError) -> Self {
        Self::Store(why)
    }
}

#[derive(Debug, Clone)]
pub struct CycleOptions {
    pub fetch_timeout: Duration,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// One full fetch-reconcile-write pass for a scope.
///
/// Holds the scope lease for the whole pass so the read-then-write
/// departure/assignment logic never interleaves with a concurrent cycle of
/// the same scope. All store writes run transactionally; a store failure
/// aborts the cycle and the next scheduled tick retries.
pub async fn run_cycle<P, D>(
    provider: &P,
    engine: &ReconciliationEngine,
    store: &D,
    scope: &Scope,
    options: &CycleOptions,
) -> Result<CycleReport, CycleError>
where
    P: SnapshotProvider + ?Sized,
    D: OccupancyStore + StationStore + SpatialIndex + ScopeLease,
{
    let Some(_lease) = store.try_acquire(scope).await? else {
        return Err(CycleError::LockContention);
    };

    let now = Utc::now();
    let snapshot = match timeout(options.fetch_timeout, provider.fetch(scope, now))
        .await
    {
        Ok(fetched) => fetched?,
        Err(_) => return Err(CycleError::FetchTimeout),
    };

    let mut stations = store.stations_by_company(&scope.company).await?;
    let station_batch =
        registry::reconcile_stations(&snapshot.stations, &stations);
    let station_updates = station_batch.updates.len();
    let station_inserts = station_batch.inserts.len();
    if !station_batch.is_empty() {
        store.apply_station_batch(&station_batch).await?;
        if station_inserts > 0 {
            // reload so assets can match the stations inserted just now
            stations = store.stations_by_company(&scope.company).await?;
        }
    }
    let directory = StationDirectory::new(stations);

    let current = store.load_active(scope).await?;
    let (batch, mut report) = engine
        .reconcile(scope, now, snapshot.assets, &current, &directory, store)
        .await?;
    if !batch.is_empty() {
        store.apply_batch(scope, &batch).await?;
    } else {
        log::debug!("{}: nothing to reconcile", scope);
    }

    report.station_updates = station_updates;
    report.station_inserts = station_inserts;
    Ok(report)
}

/// Record street locations vacated in the trailing window into the
/// free-space log. Runs as its own scheduled job.
pub async fn sweep_free_spaces<D>(
    store: &D,
    window: Duration,
) -> Result<u64, CycleError>
where
    D: OccupancyStore,
{
    let to = Utc::now();
    let from = to
        - chrono::Duration::from_std(window)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
    store
        .record_freed_street_locations(from, to)
        .await
        .map_err(CycleError::from)
}
