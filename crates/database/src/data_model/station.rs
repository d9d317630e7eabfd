use model::{station::Station, Position};
use sqlx::prelude::FromRow;
use utility::id::Id;

#[derive(Debug, Clone, FromRow)]
pub struct StationRow {
    pub id: i32,
    pub company: String,
    pub region: String,
    pub name: String,
    pub partner_id: Option<String>,
    pub capacity: i32,
    pub available: i32,
    pub longitude: f64,
    pub latitude: f64,
}

impl StationRow {
    pub fn to_model(self) -> Station {
        Station {
            id: Id::new(self.id),
            company: self.company,
            region: self.region,
            name: self.name,
            partner_id: self.partner_id,
            capacity: self.capacity.max(0) as u32,
            available: self.available.max(0) as u32,
            position: Position::new(self.longitude, self.latitude),
        }
    }
}
