use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::Position;

/// A single roadside position in the base map where a vehicle may rest.
/// Owned by the base map import; read-only to the reconciliation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetLocation {
    pub id: Id<StreetLocation>,
    pub region: String,
    pub position: Position,
}

impl HasId for StreetLocation {
    type IdType = i32;
}
