pub mod assignment;
pub mod cycle;
pub mod engine;
pub mod fleet;
pub mod provider;
pub mod registry;
pub mod store;

pub use cycle::{run_cycle, CycleError, CycleOptions};
pub use engine::{CycleReport, EngineConfig, ReconcileBatch, ReconciliationEngine};
pub use fleet::{FleetProfile, StationDirectory};
pub use provider::{ProviderError, SnapshotProvider};
pub use store::{
    OccupancyStore, ScopeLease, SpatialIndex, StationStore, StoreError,
    StreetCandidate,
};
