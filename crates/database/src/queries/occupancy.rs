use chrono::{DateTime, Utc};
use model::{occupancy::Occupancy, Scope};
use sqlx::{types::Json, Executor, Postgres};
use tracking::engine::ParkUpsert;
use tracking::store::Result;

use crate::data_model::occupancy::OccupancyRow;

use super::convert_error;

const COLUMNS: &str = "company, partner_id, region, parked, station_id, \
     street_location_id, name, address, longitude, latitude, since, attributes";

pub async fn load_active<'c, E>(executor: E, scope: &Scope) -> Result<Vec<Occupancy>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<OccupancyRow> = sqlx::query_as(
        "
        SELECT
            company, partner_id, region, parked, station_id,
            street_location_id, name, address, longitude, latitude,
            since, attributes
        FROM
            occupancies
        WHERE
            company = $1 AND region = $2;
        ",
    )
    .bind(&scope.company)
    .bind(&scope.region)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(OccupancyRow::to_model).collect())
}

/// Transition the given identities to unparked. Guarded on `parked = true`
/// so replaying the same batch touches nothing. The assignment columns are
/// deliberately left alone: they describe the last known resting place.
pub async fn unpark<'c, E>(
    executor: E,
    scope: &Scope,
    partner_ids: &[String],
    now: DateTime<Utc>,
) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query(
        "
        UPDATE occupancies
        SET parked = false, since = $4
        WHERE company = $1
            AND region = $2
            AND parked = true
            AND partner_id = ANY($3);
        ",
    )
    .bind(&scope.company)
    .bind(&scope.region)
    .bind(partner_ids)
    .bind(now)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(result.rows_affected())
}

/// Re-park a known identity, refreshing name, address, geometry and
/// assignment. Guarded on `parked = false` so replaying is a no-op.
pub async fn park_update<'c, E>(
    executor: E,
    scope: &Scope,
    park: &ParkUpsert,
    now: DateTime<Utc>,
) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query(
        "
        UPDATE occupancies
        SET parked = true, since = $4, station_id = $5,
            street_location_id = $6, name = $7, address = $8,
            longitude = $9, latitude = $10, attributes = $11
        WHERE company = $1
            AND region = $2
            AND partner_id = $3
            AND parked = false;
        ",
    )
    .bind(&scope.company)
    .bind(&scope.region)
    .bind(&park.partner_id)
    .bind(now)
    .bind(park.station_id.map(|id| id.raw()))
    .bind(park.street_location_id.map(|id| id.raw()))
    .bind(&park.name)
    .bind(&park.address)
    .bind(park.position.longitude)
    .bind(park.position.latitude)
    .bind(Json(&park.attributes))
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(result.rows_affected())
}

/// First sighting of an identity. `ON CONFLICT DO NOTHING` keeps the batch
/// idempotent against replays and concurrent inserts.
pub async fn insert<'c, E>(
    executor: E,
    scope: &Scope,
    park: &ParkUpsert,
    now: DateTime<Utc>,
) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query(&format!(
        "
        INSERT INTO occupancies ({})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (company, partner_id) DO NOTHING;
        ",
        COLUMNS
    ))
    .bind(&scope.company)
    .bind(&park.partner_id)
    .bind(&scope.region)
    .bind(park.parked)
    .bind(park.station_id.map(|id| id.raw()))
    .bind(park.street_location_id.map(|id| id.raw()))
    .bind(&park.name)
    .bind(&park.address)
    .bind(park.position.longitude)
    .bind(park.position.latitude)
    .bind(now)
    .bind(Json(&park.attributes))
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(result.rows_affected())
}

/// Log street locations vacated inside the window. Station departures are
/// not street space and are excluded.
pub async fn record_freed<'c, E>(
    executor: E,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query(
        "
        INSERT INTO free_spaces (street_location_ids, noted_at)
            SELECT array_agg(street_location_id), $2
            FROM occupancies
            WHERE parked = false
                AND station_id IS NULL
                AND street_location_id IS NOT NULL
                AND since > $1
                AND since <= $2
            HAVING count(*) > 0;
        ",
    )
    .bind(from)
    .bind(to)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(result.rows_affected())
}
