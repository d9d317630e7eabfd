use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{station::Station, street::StreetLocation, Position};

/// The persisted record of where an asset currently is, or was last seen,
/// and whether it is parked.
///
/// Identity is `(company, partner_id)`; there is at most one row per
/// identity and rows are never deleted, only transitioned. `station_id` and
/// `street_location_id` are never both set. When `parked` is false the
/// assignment columns keep describing the last known resting place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occupancy {
    pub company: String,
    pub partner_id: String,
    pub region: String,
    pub parked: bool,
    pub station_id: Option<Id<Station>>,
    pub street_location_id: Option<Id<StreetLocation>>,
    pub name: String,
    pub address: String,
    pub position: Position,
    /// Advances only on a parked/unparked transition or a station
    /// reassignment, never on mere re-observation.
    pub since: DateTime<Utc>,
    pub attributes: AssetAttributes,
}

/// Provider-reported extras carried along for API consumers. Persisted as a
/// JSON column; absent fields mean the provider does not report them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetAttributes {
    pub energy_level: Option<f64>,
    pub electric: Option<bool>,
}
