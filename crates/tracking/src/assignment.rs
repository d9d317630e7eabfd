use std::collections::{HashMap, VecDeque};

use model::{
    observation::AssetObservation, station::Station, street::StreetLocation,
    Scope,
};
use utility::{geo, id::Id};

use crate::{
    fleet::{StationDirectory, StationMatcher},
    store::{Result, SpatialIndex, StreetCandidate},
};

/// Where one observation ends up: a station, a street location, or nowhere
/// (no station reference and nothing within the assignment radius).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Station(Id<Station>),
    Street(Id<StreetLocation>),
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct Assignment {
    pub placement: Placement,
    pub distance_m: Option<f64>,
}

impl Assignment {
    fn none() -> Self {
        Self {
            placement: Placement::None,
            distance_m: None,
        }
    }
}

/// Resolve a placement for every observation, in input order.
///
/// A station match always wins over street proximity. Street locations are
/// exclusive within one batch: when two observations claim the same
/// location the closer one keeps it and the other falls back to its next
/// nearest candidate, or to no placement once its candidates run out. Exact
/// distance ties go to the earlier observation in input order.
pub async fn resolve<S>(
    scope: &Scope,
    observations: &[AssetObservation],
    matcher: &dyn StationMatcher,
    stations: &StationDirectory,
    spatial: &S,
    radius_m: f64,
    candidate_limit: u32,
) -> Result<Vec<Assignment>>
where
    S: SpatialIndex + ?Sized,
{
    let mut assignments = vec![Assignment::none(); observations.len()];
    let mut candidates: Vec<Vec<StreetCandidate>> =
        vec![Vec::new(); observations.len()];
    let mut worklist = VecDeque::new();

    for (index, observation) in observations.iter().enumerate() {
        let Some(position) = observation.position else {
            continue;
        };
        if let Some(station) = matcher.station(&scope.region, observation, stations)
        {
            let distance = geo::haversine_distance_m(
                position.latitude,
                position.longitude,
                station.position.latitude,
                station.position.longitude,
            );
            assignments[index] = Assignment {
                placement: Placement::Station(station.id),
                distance_m: Some(distance),
            };
            continue;
        }
        candidates[index] = spatial
            .nearest_street_locations(
                &scope.region,
                position,
                radius_m,
                candidate_limit,
            )
            .await?;
        worklist.push_back(index);
    }

    // claimed location -> (observation index, distance)
    let mut claims: HashMap<i32, (usize, f64)> = HashMap::new();
    let mut next_candidate = vec![0usize; observations.len()];

    while let Some(index) = worklist.pop_front() {
        assignments[index] = Assignment::none();
        while next_candidate[index] < candidates[index].len() {
            let candidate = candidates[index][next_candidate[index]].clone();
            next_candidate[index] += 1;
            match claims.get(&candidate.id.raw()) {
                Some(&(holder, held_distance))
                    if candidate.distance_m >= held_distance =>
                {
                    // taken by a closer (or equally close, earlier) claim
                    debug_assert_ne!(holder, index);
                    continue;
                }
                previous => {
                    if let Some(&(holder, _)) = previous {
                        // evict the farther claimant; it resumes from its
                        // next candidate
                        worklist.push_back(holder);
                    }
                    claims.insert(candidate.id.raw(), (index, candidate.distance_m));
                    assignments[index] = Assignment {
                        placement: Placement::Street(candidate.id),
                        distance_m: Some(candidate.distance_m),
                    };
                    break;
                }
            }
        }
    }

    Ok(assignments)
}
