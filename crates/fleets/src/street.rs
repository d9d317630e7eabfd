//! Street-parked fleet. No stations at all: the feed proposes idle
//! vehicles around a reference point and every one of them rests at a
//! plain street location.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    observation::{AssetObservation, AvailabilitySignal, Snapshot},
    occupancy::AssetAttributes,
    Position, Scope,
};
use serde::Deserialize;
use tracking::{
    fleet::{AlwaysParked, NoStations},
    FleetProfile, ProviderError, SnapshotProvider,
};

use crate::strip_jsonp;

#[derive(Debug, Clone, Deserialize)]
pub struct ProposalPayload {
    #[serde(rename = "Id")]
    pub id: i64,
    /// License plate, displayed as the vehicle name.
    #[serde(rename = "Immat")]
    pub plate: String,
    /// Internal designation; electric vehicles carry an `-R` suffix.
    #[serde(rename = "Name")]
    pub designation: String,
    #[serde(rename = "EnergyLevel")]
    pub energy_level: f64,
    #[serde(rename = "Position")]
    pub position: ProposalPosition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProposalPosition {
    #[serde(rename = "Lon")]
    pub longitude: f64,
    #[serde(rename = "Lat")]
    pub latitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProposalResponse {
    #[serde(rename = "Vehicules")]
    pub vehicles: Vec<ProposalPayload>,
}

pub struct StreetFleetClient {
    url: String,
    reference_point: Position,
    http: reqwest::Client,
}

impl StreetFleetClient {
    pub fn new<S: Into<String>>(url: S, reference_point: Position) -> Self {
        Self {
            url: url.into(),
            reference_point,
            http: reqwest::Client::new(),
        }
    }

    pub fn profile() -> FleetProfile {
        FleetProfile {
            availability: Box::new(AlwaysParked),
            matcher: Box::new(NoStations),
        }
    }
}

pub fn map_snapshot(scope: &Scope, vehicles: Vec<ProposalPayload>) -> Snapshot {
    let assets = vehicles
        .into_iter()
        .map(|vehicle| {
            let electric = vehicle.designation.ends_with("-R");
            AssetObservation {
                partner_id: vehicle.id.to_string(),
                company: scope.company.clone(),
                position: Some(Position::new(
                    vehicle.position.longitude,
                    vehicle.position.latitude,
                )),
                name: vehicle.plate,
                address: String::new(),
                availability: AvailabilitySignal::EnergyLevel(
                    vehicle.energy_level,
                ),
                station_ref: None,
                attributes: AssetAttributes {
                    energy_level: Some(vehicle.energy_level),
                    electric: Some(electric),
                },
            }
        })
        .collect();
    Snapshot {
        assets,
        stations: Vec::new(),
    }
}

#[async_trait]
impl SnapshotProvider for StreetFleetClient {
    fn fleet(&self) -> &'static str {
        "street"
    }

    async fn fetch(
        &self,
        scope: &Scope,
        _as_of: DateTime<Utc>,
    ) -> Result<Snapshot, ProviderError> {
        let text = self
            .http
            .get(&self.url)
            .query(&[
                ("Longitude", self.reference_point.longitude.to_string()),
                ("Latitude", self.reference_point.latitude.to_string()),
                ("CustomerID", "\"\"".to_owned()),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(ProviderError::unavailable)?
            .text()
            .await
            .map_err(ProviderError::unavailable)?;

        let response: ProposalResponse =
            serde_json::from_str(strip_jsonp(&text))
                .map_err(|why| ProviderError::Invalid(why.to_string()))?;
        Ok(map_snapshot(scope, response.vehicles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonp_payload_maps_to_street_observations() {
        let text = r#"({"Vehicules": [{
            "Id": 221,
            "Immat": "FTK 1234",
            "Name": "221-R",
            "EnergyLevel": 87.0,
            "Position": {"Lon": -73.563, "Lat": 45.484}
        }]});"#;
        let response: ProposalResponse =
            serde_json::from_str(strip_jsonp(text)).unwrap();
        let scope = Scope::new("streetcar", "montreal");
        let snapshot = map_snapshot(&scope, response.vehicles);

        assert_eq!(snapshot.stations.len(), 0);
        let asset = &snapshot.assets[0];
        assert_eq!(asset.partner_id, "221");
        assert_eq!(asset.name, "FTK 1234");
        assert_eq!(asset.station_ref, None);
        assert_eq!(asset.attributes.electric, Some(true));
        assert_eq!(asset.position, Some(Position::new(-73.563, 45.484)));
    }
}
