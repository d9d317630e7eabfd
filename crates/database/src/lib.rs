use std::{env, error::Error};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    occupancy::Occupancy, station::Station, Position, Scope,
};
use tracking::{
    engine::ReconcileBatch,
    registry::StationBatch,
    store::{
        OccupancyStore, Result, ScopeLease, SpatialIndex, StationStore,
        StreetCandidate,
    },
};

use queries::{convert_error, lease::ScopeLeaseGuard};

pub mod data_model;
pub mod queries;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    pool: sqlx::PgPool,
}

impl PgDatabase {
    pub async fn connect(
        connection_info: DatabaseConnectionInfo,
    ) -> std::result::Result<Self, Box<dyn Error>> {
        let url = connection_info.postgres_url();
        let pool = sqlx::postgres::PgPool::connect(&url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl OccupancyStore for PgDatabase {
    async fn load_active(&self, scope: &Scope) -> Result<Vec<Occupancy>> {
        queries::occupancy::load_active(&self.pool, scope).await
    }

    async fn apply_batch(
        &self,
        scope: &Scope,
        batch: &ReconcileBatch,
    ) -> Result<()> {
        // one transaction per cycle: partial departure/assignment updates
        // must never become visible
        let mut tx = self.pool.begin().await.map_err(convert_error)?;
        if !batch.departures.is_empty() {
            queries::occupancy::unpark(
                &mut *tx,
                scope,
                &batch.departures,
                batch.now,
            )
            .await?;
        }
        for park in &batch.parks {
            if park.known {
                queries::occupancy::park_update(&mut *tx, scope, park, batch.now)
                    .await?;
            } else {
                queries::occupancy::insert(&mut *tx, scope, park, batch.now)
                    .await?;
            }
        }
        tx.commit().await.map_err(convert_error)?;
        Ok(())
    }

    async fn record_freed_street_locations(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        queries::occupancy::record_freed(&self.pool, from, to).await
    }
}

#[async_trait]
impl StationStore for PgDatabase {
    async fn stations_by_company(&self, company: &str) -> Result<Vec<Station>> {
        queries::station::load_by_company(&self.pool, company).await
    }

    async fn apply_station_batch(&self, batch: &StationBatch) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(convert_error)?;
        for update in &batch.updates {
            queries::station::update_availability(&mut *tx, update).await?;
        }
        for station in &batch.inserts {
            queries::station::insert(&mut *tx, station).await?;
        }
        tx.commit().await.map_err(convert_error)?;
        Ok(())
    }
}

#[async_trait]
impl SpatialIndex for PgDatabase {
    async fn nearest_street_locations(
        &self,
        region: &str,
        position: Position,
        radius_m: f64,
        limit: u32,
    ) -> Result<Vec<StreetCandidate>> {
        queries::street::nearest(&self.pool, region, position, radius_m, limit)
            .await
    }
}

#[async_trait]
impl ScopeLease for PgDatabase {
    type Guard = ScopeLeaseGuard;

    async fn try_acquire(&self, scope: &Scope) -> Result<Option<Self::Guard>> {
        queries::lease::try_acquire(&self.pool, scope).await
    }
}
