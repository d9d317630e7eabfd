use std::collections::{HashMap, HashSet};

use model::station::{
    NewStation, Station, StationKey, StationObservation, StationUpdate,
};

/// The writes one cycle owes the station table. Stations are only ever
/// updated or inserted; a station missing from a snapshot keeps its
/// last-known-good row.
#[derive(Debug, Default)]
pub struct StationBatch {
    pub updates: Vec<StationUpdate>,
    pub inserts: Vec<NewStation>,
}

impl StationBatch {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty()
    }
}

/// Diff the reported stations against the persisted ones.
///
/// Emits an update only when capacity or availability actually changed, so
/// an unchanged report causes no write and no spurious change event
/// downstream. First sighting of an identity becomes an insert. Duplicate
/// identities within one snapshot collapse to the first report.
pub fn reconcile_stations(
    observations: &[StationObservation],
    existing: &[Station],
) -> StationBatch {
    let by_identity: HashMap<StationKey, &Station> = existing
        .iter()
        .map(|station| (station.identity(), station))
        .collect();

    let mut seen = HashSet::new();
    let mut batch = StationBatch::default();
    for observation in observations {
        let identity = observation.identity();
        if !seen.insert(identity.clone()) {
            continue;
        }
        let available = observation.available();
        match by_identity.get(&identity) {
            Some(station) => {
                if station.available != available
                    || station.capacity != observation.capacity
                {
                    batch.updates.push(StationUpdate {
                        id: station.id,
                        capacity: observation.capacity,
                        available,
                    });
                }
            }
            None => batch.inserts.push(NewStation {
                company: observation.company.clone(),
                region: observation.region.clone(),
                name: observation.name.clone(),
                partner_id: observation.partner_id.clone(),
                capacity: observation.capacity,
                available,
                position: observation.position,
            }),
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use model::Position;
    use utility::id::Id;

    use super::*;

    fn observation(used: u32) -> StationObservation {
        StationObservation {
            partner_id: None,
            company: "zoomway".to_owned(),
            region: "montreal".to_owned(),
            name: "Lot Berri".to_owned(),
            position: Position::new(-73.56, 45.51),
            capacity: 10,
            used_capacity: used,
        }
    }

    fn existing(available: u32) -> Station {
        Station {
            id: Id::new(42),
            company: "zoomway".to_owned(),
            region: "montreal".to_owned(),
            name: "Lot Berri".to_owned(),
            partner_id: None,
            capacity: 10,
            available,
            position: Position::new(-73.56, 45.51),
        }
    }

    #[test]
    fn availability_change_becomes_a_single_update() {
        // capacity=10 used=10 was persisted as available=0; the next report
        // says used=7
        let batch = reconcile_stations(&[observation(7)], &[existing(0)]);
        assert_eq!(batch.inserts.len(), 0);
        assert_eq!(batch.updates.len(), 1);
        assert_eq!(batch.updates[0].id, Id::new(42));
        assert_eq!(batch.updates[0].available, 3);
    }

    #[test]
    fn unchanged_report_is_a_no_op() {
        let batch = reconcile_stations(&[observation(7)], &[existing(3)]);
        assert!(batch.is_empty());
    }

    #[test]
    fn first_sighting_becomes_an_insert() {
        let batch = reconcile_stations(&[observation(4)], &[]);
        assert_eq!(batch.updates.len(), 0);
        assert_eq!(batch.inserts.len(), 1);
        assert_eq!(batch.inserts[0].available, 6);
    }

    #[test]
    fn duplicate_reports_collapse_to_the_first() {
        let batch =
            reconcile_stations(&[observation(4), observation(9)], &[]);
        assert_eq!(batch.inserts.len(), 1);
        assert_eq!(batch.inserts[0].available, 6);
    }
}
