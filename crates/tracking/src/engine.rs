use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use model::{
    observation::AssetObservation,
    occupancy::{AssetAttributes, Occupancy},
    station::Station,
    street::StreetLocation,
    Position, Scope,
};
use utility::id::Id;

use crate::{
    assignment::{self, Assignment, Placement},
    fleet::{FleetProfile, StationDirectory},
    store::{Result, SpatialIndex},
};

/// Explicit configuration, passed in at construction instead of being
/// fetched from ambient state on every cycle.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Street assignment tolerance in meters, boundary inclusive. Small
    /// relative to a street segment so assignment does not leak across
    /// parallel streets.
    pub assignment_radius_m: f64,
    /// How many ranked street candidates to consider per observation when
    /// the nearest one is contested.
    pub street_candidate_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assignment_radius_m: 5.0,
            street_candidate_limit: 8,
        }
    }
}

/// The writes one cycle owes the occupancy table, applied as a single
/// transaction. Re-applying the batch built from an identical snapshot is a
/// no-op: departures only touch rows still parked, park updates only touch
/// rows still unparked, inserts skip existing identities.
#[derive(Debug)]
pub struct ReconcileBatch {
    pub now: DateTime<Utc>,
    /// Identities to transition to `parked = false`, `since = now`. The
    /// prior assignment columns are left in place as the last known
    /// resting place.
    pub departures: Vec<String>,
    pub parks: Vec<ParkUpsert>,
}

impl ReconcileBatch {
    pub fn is_empty(&self) -> bool {
        self.departures.is_empty() && self.parks.is_empty()
    }
}

/// One asset arriving at (or first appearing in) a resting place.
#[derive(Debug, Clone)]
pub struct ParkUpsert {
    pub partner_id: String,
    /// Whether the identity already has a row: true updates in place
    /// (guarded on `parked = false`), false inserts.
    pub known: bool,
    pub parked: bool,
    pub station_id: Option<Id<Station>>,
    pub street_location_id: Option<Id<StreetLocation>>,
    pub name: String,
    pub address: String,
    pub position: Position,
    pub attributes: AssetAttributes,
}

/// Per-cycle counters, logged by the scheduler loop.
#[derive(Debug, Default, Clone)]
pub struct CycleReport {
    pub observed: usize,
    pub skipped: usize,
    pub departed: usize,
    pub parked: usize,
    pub inserted: usize,
    pub station_updates: usize,
    pub station_inserts: usize,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "observed={} skipped={} departed={} parked={} inserted={} \
             station_updates={} station_inserts={}",
            self.observed,
            self.skipped,
            self.departed,
            self.parked,
            self.inserted,
            self.station_updates,
            self.station_inserts
        )
    }
}

/// Computes, from one snapshot plus the persisted occupancy set of the same
/// scope, the full set of state transitions and spatial (re)assignments.
///
/// The engine itself is provider-agnostic: everything fleet-specific enters
/// through the [`FleetProfile`] strategies.
pub struct ReconciliationEngine {
    config: EngineConfig,
    profile: FleetProfile,
}

impl ReconciliationEngine {
    pub fn new(config: EngineConfig, profile: FleetProfile) -> Self {
        Self { config, profile }
    }

    pub async fn reconcile<S>(
        &self,
        scope: &Scope,
        now: DateTime<Utc>,
        observations: Vec<AssetObservation>,
        current: &[Occupancy],
        stations: &StationDirectory,
        spatial: &S,
    ) -> Result<(ReconcileBatch, CycleReport)>
    where
        S: SpatialIndex + ?Sized,
    {
        let mut report = CycleReport {
            observed: observations.len(),
            ..CycleReport::default()
        };

        // malformed records are skipped and counted, never fatal; duplicate
        // identities collapse to the first report, preserving input order
        let mut usable: IndexMap<String, AssetObservation> = IndexMap::new();
        for observation in observations {
            if !observation.is_usable()
                || usable.contains_key(&observation.partner_id)
            {
                report.skipped += 1;
                continue;
            }
            usable.insert(observation.partner_id.clone(), observation);
        }
        let observations: Vec<AssetObservation> =
            usable.into_values().collect();

        let assignments = assignment::resolve(
            scope,
            &observations,
            self.profile.matcher.as_ref(),
            stations,
            spatial,
            self.config.assignment_radius_m,
            self.config.street_candidate_limit,
        )
        .await?;

        let current_by_id: HashMap<&str, &Occupancy> = current
            .iter()
            .map(|occupancy| (occupancy.partner_id.as_str(), occupancy))
            .collect();

        let mut batch = ReconcileBatch {
            now,
            departures: Vec::new(),
            parks: Vec::new(),
        };
        let mut seen: HashSet<&str> = HashSet::new();

        for (observation, assignment) in observations.iter().zip(&assignments)
        {
            seen.insert(observation.partner_id.as_str());
            let resting =
                self.profile.availability.is_parked(&observation.availability);
            match current_by_id.get(observation.partner_id.as_str()) {
                Some(current) if current.parked => {
                    if !resting {
                        batch.departures.push(observation.partner_id.clone());
                        report.departed += 1;
                    } else if let Placement::Station(station_id) =
                        assignment.placement
                    {
                        if current.station_id != Some(station_id) {
                            // moved between stations while continuously
                            // reported: unpark the old row first so one
                            // identity never has two live placements
                            batch
                                .departures
                                .push(observation.partner_id.clone());
                            batch.parks.push(park_upsert(
                                observation,
                                assignment,
                                true,
                                true,
                            ));
                            report.departed += 1;
                            report.parked += 1;
                        }
                    }
                    // re-observed in the same place: no write, no since churn
                }
                Some(_) => {
                    if resting {
                        batch.parks.push(park_upsert(
                            observation,
                            assignment,
                            true,
                            true,
                        ));
                        report.parked += 1;
                    }
                }
                None => {
                    batch.parks.push(park_upsert(
                        observation,
                        assignment,
                        false,
                        resting,
                    ));
                    report.inserted += 1;
                }
            }
        }

        // no longer visible at any known location: assume it departed
        for current in current {
            if current.parked && !seen.contains(current.partner_id.as_str()) {
                batch.departures.push(current.partner_id.clone());
                report.departed += 1;
            }
        }

        Ok((batch, report))
    }
}

fn park_upsert(
    observation: &AssetObservation,
    assignment: &Assignment,
    known: bool,
    parked: bool,
) -> ParkUpsert {
    let (station_id, street_location_id) = match assignment.placement {
        Placement::Station(id) => (Some(id), None),
        Placement::Street(id) => (None, Some(id)),
        Placement::None => (None, None),
    };
    ParkUpsert {
        partner_id: observation.partner_id.clone(),
        known,
        parked,
        station_id,
        street_location_id,
        name: observation.name.clone(),
        address: observation.address.clone(),
        position: observation.position.unwrap_or(Position {
            longitude: 0.0,
            latitude: 0.0,
        }),
        attributes: observation.attributes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;
    use model::observation::{AvailabilitySignal, StationRef};

    use crate::fleet::{
        AlwaysParked, MatchByPartnerId, NoStations, ParkedWhenUnreserved,
    };
    use crate::store::{StoreError, StreetCandidate};

    use super::*;

    struct FixedIndex {
        candidates: Vec<(i32, f64)>,
    }

    #[async_trait]
    impl SpatialIndex for FixedIndex {
        async fn nearest_street_locations(
            &self,
            _region: &str,
            _position: Position,
            radius_m: f64,
            limit: u32,
        ) -> std::result::Result<Vec<StreetCandidate>, StoreError> {
            let mut found = self
                .candidates
                .iter()
                .filter(|(_, distance)| *distance <= radius_m)
                .map(|&(id, distance_m)| StreetCandidate {
                    id: Id::new(id),
                    distance_m,
                })
                .collect::<Vec<_>>();
            found.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
            found.truncate(limit as usize);
            Ok(found)
        }
    }

    fn scope() -> Scope {
        Scope::new("streetcar", "montreal")
    }

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn street_engine() -> ReconciliationEngine {
        ReconciliationEngine::new(
            EngineConfig::default(),
            FleetProfile {
                availability: Box::new(AlwaysParked),
                matcher: Box::new(NoStations),
            },
        )
    }

    fn roundtrip_engine() -> ReconciliationEngine {
        ReconciliationEngine::new(
            EngineConfig::default(),
            FleetProfile {
                availability: Box::new(ParkedWhenUnreserved),
                matcher: Box::new(MatchByPartnerId),
            },
        )
    }

    fn observation(partner_id: &str) -> AssetObservation {
        AssetObservation {
            partner_id: partner_id.to_owned(),
            company: "streetcar".to_owned(),
            position: Some(Position::new(-73.56, 45.5)),
            name: "car".to_owned(),
            address: "Rue Berri".to_owned(),
            availability: AvailabilitySignal::EnergyLevel(80.0),
            station_ref: None,
            attributes: AssetAttributes::default(),
        }
    }

    fn station(id: i32, partner_id: &str) -> Station {
        Station {
            id: Id::new(id),
            company: "streetcar".to_owned(),
            region: "montreal".to_owned(),
            name: format!("Station {}", partner_id),
            partner_id: Some(partner_id.to_owned()),
            capacity: 1,
            available: 1,
            position: Position::new(-73.56, 45.5),
        }
    }

    /// Mirror of the store semantics: departures unpark rows still parked,
    /// known parks update rows still unparked, inserts skip existing
    /// identities.
    fn apply(current: &mut Vec<Occupancy>, scope: &Scope, batch: &ReconcileBatch) {
        for partner_id in &batch.departures {
            for row in current.iter_mut() {
                if row.partner_id == *partner_id && row.parked {
                    row.parked = false;
                    row.since = batch.now;
                }
            }
        }
        for park in &batch.parks {
            if park.known {
                for row in current.iter_mut() {
                    if row.partner_id == park.partner_id && !row.parked {
                        row.parked = true;
                        row.since = batch.now;
                        row.station_id = park.station_id;
                        row.street_location_id = park.street_location_id;
                        row.name = park.name.clone();
                        row.address = park.address.clone();
                        row.position = park.position;
                        row.attributes = park.attributes.clone();
                    }
                }
            } else if !current
                .iter()
                .any(|row| row.partner_id == park.partner_id)
            {
                current.push(Occupancy {
                    company: scope.company.clone(),
                    partner_id: park.partner_id.clone(),
                    region: scope.region.clone(),
                    parked: park.parked,
                    station_id: park.station_id,
                    street_location_id: park.street_location_id,
                    name: park.name.clone(),
                    address: park.address.clone(),
                    position: park.position,
                    since: batch.now,
                    attributes: park.attributes.clone(),
                });
            }
        }
    }

    #[tokio::test]
    async fn first_sighting_parks_at_nearest_street_location() {
        let engine = street_engine();
        let index = FixedIndex {
            candidates: vec![(1, 2.0)],
        };
        let (batch, report) = engine
            .reconcile(
                &scope(),
                t(0),
                vec![observation("vin-1")],
                &[],
                &StationDirectory::new(Vec::new()),
                &index,
            )
            .await
            .unwrap();

        let mut rows = Vec::new();
        apply(&mut rows, &scope(), &batch);
        assert_eq!(report.inserted, 1);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].parked);
        assert_eq!(rows[0].street_location_id, Some(Id::new(1)));
        assert_eq!(rows[0].station_id, None);
        assert_eq!(rows[0].since, t(0));
    }

    #[tokio::test]
    async fn absent_asset_departs_and_keeps_its_last_resting_place() {
        let engine = street_engine();
        let index = FixedIndex {
            candidates: vec![(1, 2.0)],
        };
        let mut rows = Vec::new();
        let (batch, _) = engine
            .reconcile(
                &scope(),
                t(0),
                vec![observation("vin-1")],
                &rows,
                &StationDirectory::new(Vec::new()),
                &index,
            )
            .await
            .unwrap();
        apply(&mut rows, &scope(), &batch);

        let (batch, report) = engine
            .reconcile(
                &scope(),
                t(120),
                Vec::new(),
                &rows,
                &StationDirectory::new(Vec::new()),
                &index,
            )
            .await
            .unwrap();
        apply(&mut rows, &scope(), &batch);

        assert_eq!(report.departed, 1);
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].parked);
        assert_eq!(rows[0].since, t(120));
        // assignment columns describe the last known resting place
        assert_eq!(rows[0].street_location_id, Some(Id::new(1)));
    }

    #[tokio::test]
    async fn identical_snapshot_twice_is_idempotent() {
        let engine = street_engine();
        let index = FixedIndex {
            candidates: vec![(1, 2.0)],
        };
        let snapshot =
            vec![observation("vin-1"), observation("vin-2")];

        let mut rows = Vec::new();
        let (batch, _) = engine
            .reconcile(
                &scope(),
                t(0),
                snapshot.clone(),
                &rows,
                &StationDirectory::new(Vec::new()),
                &index,
            )
            .await
            .unwrap();
        apply(&mut rows, &scope(), &batch);
        let after_first = rows.clone();

        let (batch, _) = engine
            .reconcile(
                &scope(),
                t(120),
                snapshot,
                &rows,
                &StationDirectory::new(Vec::new()),
                &index,
            )
            .await
            .unwrap();
        assert!(batch.is_empty());
        apply(&mut rows, &scope(), &batch);

        assert_eq!(rows.len(), after_first.len());
        for (before, after) in after_first.iter().zip(&rows) {
            assert_eq!(before.since, after.since, "since must not churn");
            assert_eq!(before.parked, after.parked);
        }
    }

    #[tokio::test]
    async fn assignments_are_mutually_exclusive() {
        let engine = roundtrip_engine();
        let index = FixedIndex {
            candidates: vec![(1, 2.0)],
        };
        let mut at_station = observation("vin-1");
        at_station.station_ref =
            Some(StationRef::PartnerId("st-1".to_owned()));
        at_station.availability = AvailabilitySignal::Reservations(0);
        let mut on_street = observation("vin-2");
        on_street.availability = AvailabilitySignal::Reservations(0);

        let directory = StationDirectory::new(vec![station(5, "st-1")]);
        let (batch, _) = engine
            .reconcile(
                &scope(),
                t(0),
                vec![at_station, on_street],
                &[],
                &directory,
                &index,
            )
            .await
            .unwrap();

        for park in &batch.parks {
            assert!(
                park.station_id.is_none() || park.street_location_id.is_none()
            );
        }
        assert_eq!(batch.parks[0].station_id, Some(Id::new(5)));
        assert_eq!(batch.parks[1].street_location_id, Some(Id::new(1)));
    }

    #[tokio::test]
    async fn reserved_roundtrip_asset_is_unparked_while_still_reported() {
        let engine = roundtrip_engine();
        let index = FixedIndex {
            candidates: Vec::new(),
        };
        let directory = StationDirectory::new(vec![station(5, "st-1")]);

        let mut obs = observation("vin-1");
        obs.station_ref = Some(StationRef::PartnerId("st-1".to_owned()));
        obs.availability = AvailabilitySignal::Reservations(0);

        let mut rows = Vec::new();
        let (batch, _) = engine
            .reconcile(&scope(), t(0), vec![obs.clone()], &rows, &directory, &index)
            .await
            .unwrap();
        apply(&mut rows, &scope(), &batch);
        assert!(rows[0].parked);

        obs.availability = AvailabilitySignal::Reservations(1);
        let (batch, report) = engine
            .reconcile(&scope(), t(120), vec![obs], &rows, &directory, &index)
            .await
            .unwrap();
        apply(&mut rows, &scope(), &batch);

        assert_eq!(report.departed, 1);
        assert!(!rows[0].parked);
        assert_eq!(rows[0].since, t(120));
    }

    #[tokio::test]
    async fn cross_station_move_unparks_before_reparking() {
        let engine = roundtrip_engine();
        let index = FixedIndex {
            candidates: Vec::new(),
        };
        let directory =
            StationDirectory::new(vec![station(5, "st-1"), station(6, "st-2")]);

        let mut obs = observation("vin-1");
        obs.station_ref = Some(StationRef::PartnerId("st-1".to_owned()));
        obs.availability = AvailabilitySignal::Reservations(0);

        let mut rows = Vec::new();
        let (batch, _) = engine
            .reconcile(&scope(), t(0), vec![obs.clone()], &rows, &directory, &index)
            .await
            .unwrap();
        apply(&mut rows, &scope(), &batch);
        assert_eq!(rows[0].station_id, Some(Id::new(5)));

        obs.station_ref = Some(StationRef::PartnerId("st-2".to_owned()));
        let (batch, report) = engine
            .reconcile(&scope(), t(120), vec![obs], &rows, &directory, &index)
            .await
            .unwrap();
        assert_eq!(batch.departures, vec!["vin-1".to_owned()]);
        assert_eq!(batch.parks.len(), 1);
        apply(&mut rows, &scope(), &batch);

        assert_eq!(report.departed, 1);
        assert_eq!(report.parked, 1);
        assert_eq!(rows.len(), 1, "never two live rows for one identity");
        assert!(rows[0].parked);
        assert_eq!(rows[0].station_id, Some(Id::new(6)));
        assert_eq!(rows[0].since, t(120));
    }

    #[tokio::test]
    async fn malformed_observations_are_skipped_and_counted() {
        let engine = street_engine();
        let index = FixedIndex {
            candidates: Vec::new(),
        };
        let mut no_position = observation("vin-1");
        no_position.position = None;
        let mut blank_id = observation("  ");
        blank_id.partner_id = "  ".to_owned();
        let duplicate = observation("vin-2");

        let (batch, report) = engine
            .reconcile(
                &scope(),
                t(0),
                vec![no_position, blank_id, duplicate.clone(), duplicate],
                &[],
                &StationDirectory::new(Vec::new()),
                &index,
            )
            .await
            .unwrap();

        assert_eq!(report.observed, 4);
        assert_eq!(report.skipped, 3);
        assert_eq!(batch.parks.len(), 1);
        assert_eq!(batch.parks[0].partner_id, "vin-2");
    }

    #[tokio::test]
    async fn out_of_radius_asset_parks_without_assignment() {
        let engine = street_engine();
        let index = FixedIndex {
            candidates: vec![(1, 6.0)],
        };
        let (batch, _) = engine
            .reconcile(
                &scope(),
                t(0),
                vec![observation("vin-1")],
                &[],
                &StationDirectory::new(Vec::new()),
                &index,
            )
            .await
            .unwrap();
        assert_eq!(batch.parks[0].station_id, None);
        assert_eq!(batch.parks[0].street_location_id, None);
        assert!(batch.parks[0].parked);
    }
}
