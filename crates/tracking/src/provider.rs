use std::error::Error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{observation::Snapshot, Scope};

#[derive(Debug)]
pub enum ProviderError {
    /// The feed could not be reached; transient, retried on the next tick.
    Unavailable(Box<dyn Error + Send + Sync>),
    /// The feed answered with a payload that does not parse; the whole
    /// cycle is skipped since partial data must never be reconciled.
    Invalid(String),
}

impl ProviderError {
    pub fn unavailable<E: Error + Send + Sync + 'static>(why: E) -> Self {
        Self::Unavailable(Box::new(why))
    }
}

/// One feed per fleet type. A fetch returns the complete, current
/// enumeration of the asset population for the scope; there is no
/// incremental delta variant.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Stable fleet label used in logs.
    fn fleet(&self) -> &'static str;

    async fn fetch(
        &self,
        scope: &Scope,
        as_of: DateTime<Utc>,
    ) -> Result<Snapshot, ProviderError>;
}
