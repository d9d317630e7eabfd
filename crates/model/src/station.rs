use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::Position;

/// A fixed-capacity pickup/drop-off point operated by a company.
///
/// Stations are created on first sighting and never deleted; a station that
/// temporarily stops reporting keeps its last-known-good capacity figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: Id<Station>,
    pub company: String,
    pub region: String,
    pub name: String,
    pub partner_id: Option<String>,
    pub capacity: u32,
    pub available: u32,
    pub position: Position,
}

impl HasId for Station {
    type IdType = i32;
}

impl Station {
    pub fn identity(&self) -> StationKey {
        StationKey::from_parts(
            self.partner_id.as_deref(),
            &self.region,
            &self.name,
        )
    }
}

/// Identity of a station within one company: the provider's stable id when
/// one exists, the `(region, name)` pair otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StationKey {
    PartnerId(String),
    Named { region: String, name: String },
}

impl StationKey {
    pub fn from_parts(partner_id: Option<&str>, region: &str, name: &str) -> Self {
        match partner_id {
            Some(pid) => Self::PartnerId(pid.to_owned()),
            None => Self::Named {
                region: region.to_owned(),
                name: name.to_owned(),
            },
        }
    }
}

/// One station as reported by a provider in the current cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationObservation {
    pub partner_id: Option<String>,
    pub company: String,
    pub region: String,
    pub name: String,
    pub position: Position,
    pub capacity: u32,
    pub used_capacity: u32,
}

impl StationObservation {
    pub fn identity(&self) -> StationKey {
        StationKey::from_parts(
            self.partner_id.as_deref(),
            &self.region,
            &self.name,
        )
    }

    /// Free capacity as derived from the report.
    pub fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.used_capacity)
    }
}

/// An in-place capacity/availability refresh for a known station.
#[derive(Debug, Clone)]
pub struct StationUpdate {
    pub id: Id<Station>,
    pub capacity: u32,
    pub available: u32,
}

/// A station row about to be inserted, before the store has assigned an id.
#[derive(Debug, Clone)]
pub struct NewStation {
    pub company: String,
    pub region: String,
    pub name: String,
    pub partner_id: Option<String>,
    pub capacity: u32,
    pub available: u32,
    pub position: Position,
}
