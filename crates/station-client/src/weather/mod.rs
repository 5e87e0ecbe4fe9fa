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

//! Weather snapshots and the fetcher abstraction.
//!
//! A [`WeatherFetcher`] turns one [`WeatherRequest`] into a
//! [`WeatherSnapshot`] or a [`FetchError`]. Two transports are provided:
//! the plugin's own data endpoint and OpenWeatherMap called directly.
//! Neither caches; caching belongs to the server side.

pub mod endpoint;
pub mod openweathermap;

pub use endpoint::EndpointFetcher;
pub use openweathermap::OpenWeatherMapFetcher;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::{Station, StationId};

/// Display unit system for fetched readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub const ALL: [UnitSystem; 2] = [UnitSystem::Metric, UnitSystem::Imperial];

    /// Value sent as the `units` request parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    #[must_use]
    pub fn temperature_symbol(self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
        }
    }

    /// Label of the toggle control that selects this unit system.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "Celsius",
            UnitSystem::Imperial => "Fahrenheit",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" | "celsius" | "c" => Ok(UnitSystem::Metric),
            "imperial" | "fahrenheit" | "f" => Ok(UnitSystem::Imperial),
            other => Err(format!("unknown unit system: {other}")),
        }
    }
}

/// One single-station weather request.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub station_id: StationId,
    pub lat: f64,
    pub lng: f64,
    pub units: UnitSystem,
}

impl WeatherRequest {
    #[must_use]
    pub fn for_station(station: &Station, units: UnitSystem) -> Self {
        Self {
            station_id: station.id,
            lat: station.lat,
            lng: station.lng,
            units,
        }
    }
}

/// A point-in-time reading for one station under one unit system.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub condition_main: String,
    pub condition_description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub units: UnitSystem,
    pub fetched_at: DateTime<Utc>,
}

/// Why a fetch produced no snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The request never produced a readable response.
    #[error("Network error: {0}")]
    Network(String),

    /// The data feed answered with an explicit failure.
    #[error("{0}")]
    Rejected(String),

    /// The response arrived but did not have the expected shape.
    #[error("Invalid weather data: {0}")]
    Decode(String),
}

impl FetchError {
    /// Message for the detail panel, which reports every failure as a
    /// network error, explicit failure payloads included.
    #[must_use]
    pub fn detail_message(&self) -> String {
        match self {
            FetchError::Network(_) => self.to_string(),
            FetchError::Rejected(message) | FetchError::Decode(message) => {
                format!("Network error: {message}")
            }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// Wire shape of a current-weather reading.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub weather: Vec<ConditionPayload>,
    pub main: MainPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionPayload {
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainPayload {
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: f64,
    pub humidity: f64,
}

impl WeatherPayload {
    /// Convert into a snapshot tagged with the unit system it was requested in.
    pub fn into_snapshot(self, units: UnitSystem) -> Result<WeatherSnapshot, FetchError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Decode("no weather conditions in payload".to_string()))?;

        Ok(WeatherSnapshot {
            location_name: self.name,
            condition_main: condition.main,
            condition_description: condition.description,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            pressure: self.main.pressure,
            humidity: self.main.humidity,
            units,
            fetched_at: Utc::now(),
        })
    }
}

/// Issues single-station weather requests.
///
/// Implementations return a `'static` future so the driver can run many
/// fetches concurrently; clone whatever client state the future needs.
pub trait WeatherFetcher: Send + Sync {
    fn fetch(&self, request: WeatherRequest) -> BoxFuture<'static, Result<WeatherSnapshot, FetchError>>;
}
