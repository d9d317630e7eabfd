use chrono::{DateTime, Utc};
use model::{
    occupancy::{AssetAttributes, Occupancy},
    Position,
};
use sqlx::{prelude::FromRow, types::Json};
use utility::id::Id;

#[derive(Debug, Clone, FromRow)]
pub struct OccupancyRow {
    pub company: String,
    pub partner_id: String,
    pub region: String,
    pub parked: bool,
    pub station_id: Option<i32>,
    pub street_location_id: Option<i32>,
    pub name: String,
    pub address: String,
    pub longitude: f64,
    pub latitude: f64,
    pub since: DateTime<Utc>,
    pub attributes: Option<Json<AssetAttributes>>,
}

impl OccupancyRow {
    pub fn to_model(self) -> Occupancy {
        Occupancy {
            company: self.company,
            partner_id: self.partner_id,
            region: self.region,
            parked: self.parked,
            station_id: self.station_id.map(Id::new),
            street_location_id: self.street_location_id.map(Id::new),
            name: self.name,
            address: self.address,
            position: Position::new(self.longitude, self.latitude),
            since: self.since,
            attributes: self
                .attributes
                .map(|attributes| attributes.0)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn row_converts_to_model() {
        let row = OccupancyRow {
            company: "streetcar".to_owned(),
            partner_id: "vin-1".to_owned(),
            region: "montreal".to_owned(),
            parked: true,
            station_id: None,
            street_location_id: Some(9),
            name: "car".to_owned(),
            address: "Rue Berri".to_owned(),
            longitude: -73.56,
            latitude: 45.5,
            since: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            attributes: None,
        };
        let occupancy = row.to_model();
        assert_eq!(occupancy.street_location_id, Some(Id::new(9)));
        assert_eq!(occupancy.station_id, None);
        assert_eq!(occupancy.attributes, AssetAttributes::default());
        assert_eq!(occupancy.position, Position::new(-73.56, 45.5));
    }
}
