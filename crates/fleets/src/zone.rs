//! Free-floating zone fleet. The feed lists every idle vehicle plus the
//! company's own parking lots; a vehicle standing in a lot reports the lot
//! name as its address.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    observation::{AssetObservation, AvailabilitySignal, Snapshot, StationRef},
    occupancy::AssetAttributes,
    station::StationObservation,
    Position, Scope,
};
use serde::Deserialize;
use tracking::{
    fleet::{AlwaysParked, MatchByName},
    FleetProfile, ProviderError, SnapshotProvider,
};

#[derive(Debug, Clone, Deserialize)]
pub struct VehiclePayload {
    pub vin: String,
    pub name: String,
    pub address: String,
    pub fuel: f64,
    /// `[longitude, latitude, altitude]`
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotPayload {
    pub name: String,
    pub total_capacity: u32,
    pub used_capacity: u32,
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacemarkResponse<T> {
    pub placemarks: Vec<T>,
}

pub struct ZoneFleetClient {
    base_url: String,
    consumer_key: String,
    http: reqwest::Client,
}

impl ZoneFleetClient {
    pub fn new<S: Into<String>>(base_url: S, consumer_key: S) -> Self {
        Self {
            base_url: base_url.into(),
            consumer_key: consumer_key.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn profile() -> FleetProfile {
        FleetProfile {
            availability: Box::new(AlwaysParked),
            matcher: Box::new(MatchByName),
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        region: &str,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(&[
                ("loc", region),
                ("format", "json"),
                ("oauth_consumer_key", self.consumer_key.as_str()),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(ProviderError::unavailable)?;
        response
            .json()
            .await
            .map_err(|why| ProviderError::Invalid(why.to_string()))
    }
}

fn position_from(coordinates: &[f64]) -> Option<Position> {
    match coordinates {
        [longitude, latitude, ..] => Some(Position::new(*longitude, *latitude)),
        _ => None,
    }
}

pub fn map_snapshot(
    scope: &Scope,
    vehicles: Vec<VehiclePayload>,
    lots: Vec<LotPayload>,
) -> Snapshot {
    let assets = vehicles
        .into_iter()
        .map(|vehicle| AssetObservation {
            partner_id: vehicle.vin,
            company: scope.company.clone(),
            position: position_from(&vehicle.coordinates),
            name: vehicle.name,
            station_ref: Some(StationRef::Name(vehicle.address.clone())),
            address: vehicle.address,
            availability: AvailabilitySignal::EnergyLevel(vehicle.fuel),
            attributes: AssetAttributes {
                energy_level: Some(vehicle.fuel),
                electric: None,
            },
        })
        .collect();
    let stations = lots
        .into_iter()
        .filter_map(|lot| {
            let position = position_from(&lot.coordinates)?;
            Some(StationObservation {
                partner_id: None,
                company: scope.company.clone(),
                region: scope.region.clone(),
                name: lot.name,
                position,
                capacity: lot.total_capacity,
                used_capacity: lot.used_capacity,
            })
        })
        .collect();
    Snapshot { assets, stations }
}

#[async_trait]
impl SnapshotProvider for ZoneFleetClient {
    fn fleet(&self) -> &'static str {
        "zone"
    }

    async fn fetch(
        &self,
        scope: &Scope,
        _as_of: DateTime<Utc>,
    ) -> Result<Snapshot, ProviderError> {
        let vehicles: PlacemarkResponse<VehiclePayload> =
            self.get("vehicles", &scope.region).await?;
        let lots: PlacemarkResponse<LotPayload> =
            self.get("parkingspots", &scope.region).await?;
        Ok(map_snapshot(scope, vehicles.placemarks, lots.placemarks))
    }
}
