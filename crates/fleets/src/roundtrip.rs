//! Round-trip fleet. Every vehicle belongs to a single-car station and the
//! feed reports a reservation count instead of a presence list: a vehicle
//! with open reservations is away (or about to be) even though it is still
//! enumerated.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use model::{
    observation::{AssetObservation, AvailabilitySignal, Snapshot, StationRef},
    occupancy::AssetAttributes,
    station::StationObservation,
    Position, Scope,
};
use serde::Deserialize;
use tracking::{
    fleet::{MatchByPartnerId, ParkedWhenUnreserved},
    FleetProfile, ProviderError, SnapshotProvider,
};

use crate::strip_jsonp;

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityPayload {
    #[serde(rename = "CarID")]
    pub car_id: i64,
    #[serde(rename = "StationID")]
    pub station_id: i64,
    #[serde(rename = "strNomStation")]
    pub station_name: String,
    #[serde(rename = "NbrRes")]
    pub reservations: u32,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityResponse {
    pub data: Vec<AvailabilityPayload>,
}

pub struct RoundtripFleetClient {
    url: String,
    /// Region name -> the partner's numeric city id.
    city_ids: HashMap<String, u32>,
    booking_window: Duration,
    http: reqwest::Client,
}

impl RoundtripFleetClient {
    pub fn new<S: Into<String>>(url: S, city_ids: HashMap<String, u32>) -> Self {
        Self {
            url: url.into(),
            city_ids,
            booking_window: Duration::minutes(30),
            http: reqwest::Client::new(),
        }
    }

    pub fn profile() -> FleetProfile {
        FleetProfile {
            availability: Box::new(ParkedWhenUnreserved),
            matcher: Box::new(MatchByPartnerId),
        }
    }
}

pub fn map_snapshot(scope: &Scope, entries: Vec<AvailabilityPayload>) -> Snapshot {
    let mut assets = Vec::with_capacity(entries.len());
    let mut stations = Vec::with_capacity(entries.len());
    for entry in entries {
        let position = Position::new(entry.longitude, entry.latitude);
        let station_partner_id = entry.station_id.to_string();
        stations.push(StationObservation {
            partner_id: Some(station_partner_id.clone()),
            company: scope.company.clone(),
            region: scope.region.clone(),
            name: entry.station_name.clone(),
            position,
            // every station hosts exactly one vehicle
            capacity: 1,
            used_capacity: entry.reservations.min(1),
        });
        assets.push(AssetObservation {
            partner_id: entry.car_id.to_string(),
            company: scope.company.clone(),
            position: Some(position),
            name: entry.model,
            address: entry.station_name,
            availability: AvailabilitySignal::Reservations(entry.reservations),
            station_ref: Some(StationRef::PartnerId(station_partner_id)),
            attributes: AssetAttributes::default(),
        });
    }
    Snapshot { assets, stations }
}

#[async_trait]
impl SnapshotProvider for RoundtripFleetClient {
    fn fleet(&self) -> &'static str {
        "roundtrip"
    }

    async fn fetch(
        &self,
        scope: &Scope,
        as_of: DateTime<Utc>,
    ) -> Result<Snapshot, ProviderError> {
        let Some(city_id) = self.city_ids.get(&scope.region) else {
            return Err(ProviderError::Invalid(format!(
                "no city id configured for region '{}'",
                scope.region
            )));
        };
        let start = as_of;
        let finish = as_of + self.booking_window;

        let text = self
            .http
            .post(&self.url)
            .form(&[
                ("CityID", city_id.to_string()),
                ("StartDate", start.format("%d/%m/%Y %H:%M").to_string()),
                ("EndDate", finish.format("%d/%m/%Y %H:%M").to_string()),
                ("FeeType", "80".to_owned()),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(ProviderError::unavailable)?
            .text()
            .await
            .map_err(ProviderError::unavailable)?;

        let response: AvailabilityResponse =
            serde_json::from_str(strip_jsonp(&text))
                .map_err(|why| ProviderError::Invalid(why.to_string()))?;
        Ok(map_snapshot(scope, response.data))
    }
}
