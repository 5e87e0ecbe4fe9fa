// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Station registry.
//!
//! Holds the immutable list of weather stations supplied by the host at
//! startup. Lookups that miss are a normal outcome (a bookmark for a deleted
//! station, a malformed URL fragment) and are reported as `None`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Identity of a station, as assigned by the hosting CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u64);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(StationId)
    }
}

impl From<u64> for StationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A fixed weather station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    /// Display name. The CMS feed calls this field `title`.
    #[serde(alias = "title", default)]
    pub name: String,
    #[serde(deserialize_with = "de_coordinate")]
    pub lat: f64,
    #[serde(deserialize_with = "de_coordinate")]
    pub lng: f64,
}

impl Station {
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: StationId(id),
            name: name.into(),
            lat,
            lng,
        }
    }

    #[must_use]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    fn has_valid_coordinates(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

// Post meta comes through as strings, so accept both "52.52" and 52.52.
fn de_coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Errors raised while building the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate station id: {0}")]
    DuplicateId(StationId),

    #[error("station {0} has invalid coordinates")]
    InvalidCoordinates(StationId),

    #[error("malformed station feed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Read-only, ordered collection of stations.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    stations: Vec<Station>,
    index: HashMap<StationId, usize>,
}

impl StationRegistry {
    /// Build a registry, rejecting duplicate ids and unusable coordinates.
    pub fn new(stations: Vec<Station>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(stations.len());

        for (position, station) in stations.iter().enumerate() {
            if !station.has_valid_coordinates() {
                return Err(RegistryError::InvalidCoordinates(station.id));
            }
            if index.insert(station.id, position).is_some() {
                return Err(RegistryError::DuplicateId(station.id));
            }
        }

        Ok(Self { stations, index })
    }

    /// Parse a JSON array of station records.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let stations: Vec<Station> = serde_json::from_str(json)?;
        Self::new(stations)
    }

    #[must_use]
    pub fn find_by_id(&self, id: StationId) -> Option<&Station> {
        self.index.get(&id).map(|&position| &self.stations[position])
    }

    #[must_use]
    pub fn contains(&self, id: StationId) -> bool {
        self.index.contains_key(&id)
    }

    /// All stations in feed order.
    #[must_use]
    pub fn all(&self) -> &[Station] {
        &self.stations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
