use sqlx::prelude::FromRow;
use tracking::StreetCandidate;
use utility::id::Id;

#[derive(Debug, Clone, FromRow)]
pub struct StreetCandidateRow {
    pub id: i32,
    pub distance_m: f64,
}

impl StreetCandidateRow {
    pub fn to_model(self) -> StreetCandidate {
        StreetCandidate {
            id: Id::new(self.id),
            distance_m: self.distance_m,
        }
    }
}
