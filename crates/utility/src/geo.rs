pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// Bounding box around a center point, used to pre-filter candidates before
/// the exact distance comparison happens in the database.
/// Returns `((min_lat, min_lon), (max_lat, max_lon))` in degrees.
pub fn calculate_bounding_box(
    lat: f64,
    lon: f64,
    radius_m: f64,
) -> ((f64, f64), (f64, f64)) {
    let lat_rad = to_radians(lat);
    let lon_rad = to_radians(lon);

    // Latitude bounds
    let min_lat = lat_rad - radius_m / EARTH_RADIUS_M;
    let max_lat = lat_rad + radius_m / EARTH_RADIUS_M;

    // Longitude bounds (adjusted by latitude)
    let min_lon = lon_rad - radius_m / (EARTH_RADIUS_M * lat_rad.cos());
    let max_lon = lon_rad + radius_m / (EARTH_RADIUS_M * lat_rad.cos());

    (
        (to_degrees(min_lat), to_degrees(min_lon)),
        (to_degrees(max_lat), to_degrees(max_lon)),
    )
}

pub fn haversine_distance_m(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lon1_rad = to_radians(longitude_1);
    let lat2_rad = to_radians(latitude_2);
    let lon2_rad = to_radians(longitude_2);

    let dlat = lat2_rad - lat1_rad;
    let dlon = lon2_rad - lon1_rad;

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(haversine_distance_m(45.5, -73.56, 45.5, -73.56), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_distance_m(45.0, -73.0, 46.0, -73.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn bounding_box_contains_center() {
        let ((min_lat, min_lon), (max_lat, max_lon)) =
            calculate_bounding_box(45.5, -73.56, 50.0);
        assert!(min_lat < 45.5 && 45.5 < max_lat);
        assert!(min_lon < -73.56 && -73.56 < max_lon);
    }
}
