use model::Position;
use sqlx::{Executor, Postgres};
use tracking::store::Result;
use tracking::StreetCandidate;
use utility::geo::{self, EARTH_RADIUS_M};

use crate::data_model::street::StreetCandidateRow;

use super::convert_error;

/// Nearest street locations within `radius_m` of the position, ascending by
/// distance, boundary inclusive. A bounding box computed on the Rust side
/// pre-filters the candidates so the haversine term only runs on a handful
/// of rows.
pub async fn nearest<'c, E>(
    executor: E,
    region: &str,
    position: Position,
    radius_m: f64,
    limit: u32,
) -> Result<Vec<StreetCandidate>>
where
    E: Executor<'c, Database = Postgres>,
{
    let ((min_lat, min_lon), (max_lat, max_lon)) = geo::calculate_bounding_box(
        position.latitude,
        position.longitude,
        radius_m,
    );

    let rows: Vec<StreetCandidateRow> = sqlx::query_as(
        "
        WITH distance_calc AS (
            SELECT
                id,
                ($1 * ACOS(LEAST(1.0,
                    COS(RADIANS($2)) * COS(RADIANS(latitude)) *
                    COS(RADIANS(longitude) - RADIANS($3)) +
                    SIN(RADIANS($2)) * SIN(RADIANS(latitude))
                ))) AS distance_m
            FROM
                street_locations
            WHERE
                region = $4
                AND latitude BETWEEN $5 AND $6
                AND longitude BETWEEN $7 AND $8
        )
        SELECT id, distance_m
        FROM distance_calc
        WHERE distance_m <= $9
        ORDER BY distance_m ASC, id ASC
        LIMIT $10;
        ",
    )
    .bind(EARTH_RADIUS_M)
    .bind(position.latitude)
    .bind(position.longitude)
    .bind(region)
    .bind(min_lat)
    .bind(max_lat)
    .bind(min_lon)
    .bind(max_lon)
    .bind(radius_m)
    .bind(limit as i64)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(StreetCandidateRow::to_model).collect())
}
