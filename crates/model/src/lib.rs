use std::fmt;

use serde::{Deserialize, Serialize};

pub mod observation;
pub mod occupancy;
pub mod station;
pub mod street;

/// A WGS84 point. Longitude first, matching the order the feed payloads use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub longitude: f64,
    pub latitude: f64,
}

impl Position {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

/// A `(company, region)` pair. One reconciliation cycle always operates on
/// exactly one scope; distinct scopes touch disjoint rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub company: String,
    pub region: String,
}

impl Scope {
    pub fn new<C: Into<String>, R: Into<String>>(company: C, region: R) -> Self {
        Self {
            company: company.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.company, self.region)
    }
}
