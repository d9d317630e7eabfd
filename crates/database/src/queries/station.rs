use model::station::{NewStation, Station, StationUpdate};
use sqlx::{Executor, Postgres};
use tracking::store::Result;

use crate::data_model::station::StationRow;

use super::convert_error;

pub async fn load_by_company<'c, E>(
    executor: E,
    company: &str,
) -> Result<Vec<Station>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<StationRow> = sqlx::query_as(
        "
        SELECT
            id, company, region, name, partner_id, capacity, available,
            longitude, latitude
        FROM
            stations
        WHERE
            company = $1
        ORDER BY
            id;
        ",
    )
    .bind(company)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(StationRow::to_model).collect())
}

pub async fn update_availability<'c, E>(
    executor: E,
    update: &StationUpdate,
) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        UPDATE stations
        SET capacity = $2, available = $3
        WHERE id = $1;
        ",
    )
    .bind(update.id.raw())
    .bind(update.capacity as i32)
    .bind(update.available as i32)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

/// Insert a station sighted for the first time. A concurrent cycle racing
/// on the same identity loses silently via the unique indexes.
pub async fn insert<'c, E>(executor: E, station: &NewStation) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO stations
            (company, region, name, partner_id, capacity, available,
             longitude, latitude)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT DO NOTHING;
        ",
    )
    .bind(&station.company)
    .bind(&station.region)
    .bind(&station.name)
    .bind(&station.partner_id)
    .bind(station.capacity as i32)
    .bind(station.available as i32)
    .bind(station.position.longitude)
    .bind(station.position.latitude)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}
