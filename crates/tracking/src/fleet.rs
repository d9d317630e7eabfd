use std::collections::HashMap;

use model::{
    observation::{AssetObservation, AvailabilitySignal, StationRef},
    station::Station,
};

/// Translates a provider's raw availability signal into "the asset is
/// resting at this location". Injected per provider so the engine stays
/// provider-agnostic.
pub trait AvailabilityRule: Send + Sync {
    fn is_parked(&self, signal: &AvailabilitySignal) -> bool;
}

/// Presence in the feed means the asset is resting. Used by fleets whose
/// feed only lists idle vehicles.
pub struct AlwaysParked;

impl AvailabilityRule for AlwaysParked {
    fn is_parked(&self, _signal: &AvailabilitySignal) -> bool {
        true
    }
}

/// Round-trip fleets list every vehicle together with its open reservation
/// count; a reserved vehicle is away (or about to be) even though it is
/// still reported.
pub struct ParkedWhenUnreserved;

impl AvailabilityRule for ParkedWhenUnreserved {
    fn is_parked(&self, signal: &AvailabilitySignal) -> bool {
        match signal {
            AvailabilitySignal::Reservations(count) => *count == 0,
            _ => true,
        }
    }
}

/// Resolves an observation's station reference against the known stations
/// of the company. Station match takes priority over street proximity.
pub trait StationMatcher: Send + Sync {
    fn station<'a>(
        &self,
        region: &str,
        observation: &AssetObservation,
        stations: &'a StationDirectory,
    ) -> Option<&'a Station>;
}

/// Fleets that report the lot an asset sits in by its display name.
pub struct MatchByName;

impl StationMatcher for MatchByName {
    fn station<'a>(
        &self,
        region: &str,
        observation: &AssetObservation,
        stations: &'a StationDirectory,
    ) -> Option<&'a Station> {
        match &observation.station_ref {
            Some(StationRef::Name(name)) => stations.by_name(region, name),
            _ => None,
        }
    }
}

/// Fleets that report the station by the provider's own stable id.
pub struct MatchByPartnerId;

impl StationMatcher for MatchByPartnerId {
    fn station<'a>(
        &self,
        _region: &str,
        observation: &AssetObservation,
        stations: &'a StationDirectory,
    ) -> Option<&'a Station> {
        match &observation.station_ref {
            Some(StationRef::PartnerId(pid)) => stations.by_partner_id(pid),
            _ => None,
        }
    }
}

/// Fleets without stations; every asset resolves against the street map.
pub struct NoStations;

impl StationMatcher for NoStations {
    fn station<'a>(
        &self,
        _region: &str,
        _observation: &AssetObservation,
        _stations: &'a StationDirectory,
    ) -> Option<&'a Station> {
        None
    }
}

/// The two strategies a fleet plugs into the engine.
pub struct FleetProfile {
    pub availability: Box<dyn AvailabilityRule>,
    pub matcher: Box<dyn StationMatcher>,
}

/// The stations of one company, indexed for matching.
pub struct StationDirectory {
    stations: Vec<Station>,
    by_partner_id: HashMap<String, usize>,
    by_name: HashMap<(String, String), usize>,
}

impl StationDirectory {
    pub fn new(stations: Vec<Station>) -> Self {
        let mut by_partner_id = HashMap::new();
        let mut by_name = HashMap::new();
        for (index, station) in stations.iter().enumerate() {
            if let Some(pid) = &station.partner_id {
                by_partner_id.insert(pid.clone(), index);
            }
            by_name.insert(
                (station.region.clone(), station.name.clone()),
                index,
            );
        }
        Self {
            stations,
            by_partner_id,
            by_name,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn by_partner_id(&self, partner_id: &str) -> Option<&Station> {
        self.by_partner_id
            .get(partner_id)
            .map(|index| &self.stations[*index])
    }

    pub fn by_name(&self, region: &str, name: &str) -> Option<&Station> {
        self.by_name
            .get(&(region.to_owned(), name.to_owned()))
            .map(|index| &self.stations[*index])
    }
}

#[cfg(test)]
mod tests {
    use model::{occupancy::AssetAttributes, Position};
    use utility::id::Id;

    use super::*;

    fn station(id: i32, name: &str, partner_id: Option<&str>) -> Station {
        Station {
            id: Id::new(id),
            company: "roundabout".to_owned(),
            region: "montreal".to_owned(),
            name: name.to_owned(),
            partner_id: partner_id.map(str::to_owned),
            capacity: 4,
            available: 2,
            position: Position::new(-73.56, 45.5),
        }
    }

    fn observation(station_ref: Option<StationRef>) -> AssetObservation {
        AssetObservation {
            partner_id: "vin-1".to_owned(),
            company: "roundabout".to_owned(),
            position: Some(Position::new(-73.56, 45.5)),
            name: "car".to_owned(),
            address: "somewhere".to_owned(),
            availability: AvailabilitySignal::None,
            station_ref,
            attributes: AssetAttributes::default(),
        }
    }

    #[test]
    fn reservation_rule_unparks_reserved_assets() {
        let rule = ParkedWhenUnreserved;
        assert!(rule.is_parked(&AvailabilitySignal::Reservations(0)));
        assert!(!rule.is_parked(&AvailabilitySignal::Reservations(2)));
        assert!(rule.is_parked(&AvailabilitySignal::EnergyLevel(50.0)));
    }

    #[test]
    fn name_matcher_is_region_scoped() {
        let directory =
            StationDirectory::new(vec![station(7, "Main & 5th", None)]);
        let matcher = MatchByName;
        let obs =
            observation(Some(StationRef::Name("Main & 5th".to_owned())));
        let hit = matcher.station("montreal", &obs, &directory);
        assert_eq!(hit.map(|s| s.id), Some(Id::new(7)));
        assert!(matcher.station("quebec", &obs, &directory).is_none());
    }

    #[test]
    fn partner_id_matcher_ignores_names() {
        let directory =
            StationDirectory::new(vec![station(3, "Lot A", Some("st-9"))]);
        let matcher = MatchByPartnerId;
        let by_pid =
            observation(Some(StationRef::PartnerId("st-9".to_owned())));
        let by_name = observation(Some(StationRef::Name("Lot A".to_owned())));
        assert!(matcher.station("montreal", &by_pid, &directory).is_some());
        assert!(matcher.station("montreal", &by_name, &directory).is_none());
    }
}
