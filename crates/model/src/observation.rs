use serde::{Deserialize, Serialize};

use crate::{occupancy::AssetAttributes, station::StationObservation, Position};

/// One asset as reported by a provider in the current cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetObservation {
    pub partner_id: String,
    pub company: String,
    pub position: Option<Position>,
    pub name: String,
    pub address: String,
    pub availability: AvailabilitySignal,
    pub station_ref: Option<StationRef>,
    pub attributes: AssetAttributes,
}

impl AssetObservation {
    /// A usable observation has a non-blank identity and a valid position.
    pub fn is_usable(&self) -> bool {
        !self.partner_id.trim().is_empty()
            && self.position.map(|p| p.is_valid()).unwrap_or(false)
    }
}

/// Raw availability as the provider reports it. This is provider-defined and
/// not directly an occupancy state; an `AvailabilityRule` translates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AvailabilitySignal {
    /// Fuel or battery level, 0.0 to 100.0.
    EnergyLevel(f64),
    /// Number of open reservations on the asset.
    Reservations(u32),
    /// The provider reports nothing beyond presence.
    None,
}

/// How an observation refers to the station it is parked at, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationRef {
    Name(String),
    PartnerId(String),
}

/// The complete enumeration one provider returns for a scope in one cycle.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub assets: Vec<AssetObservation>,
    pub stations: Vec<StationObservation>,
}
