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

//! OpenWeatherMap current-weather fetcher.

use std::time::Duration;

use futures::future::BoxFuture;
use log::debug;

use super::{FetchError, UnitSystem, WeatherFetcher, WeatherPayload, WeatherRequest, WeatherSnapshot};

/// Environment variable that overrides any configured API key.
pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Calls the OpenWeatherMap current-weather API without a plugin in between.
#[derive(Clone)]
pub struct OpenWeatherMapFetcher {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenWeatherMapFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherMapFetcher")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenWeatherMapFetcher {
    pub fn new(api_key: String) -> Result<Self, FetchError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    /// Resolve API key from environment variable or config
    #[must_use]
    pub fn resolve_api_key(config_key: Option<&str>) -> Option<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                return Some(key);
            }
        }

        config_key.map(str::to_string).filter(|s| !s.is_empty())
    }
}

impl WeatherFetcher for OpenWeatherMapFetcher {
    fn fetch(&self, request: WeatherRequest) -> BoxFuture<'static, Result<WeatherSnapshot, FetchError>> {
        let client = self.client.clone();
        let url = format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'));
        let api_key = self.api_key.clone();

        Box::pin(async move {
            debug!(
                "Requesting OpenWeatherMap data for station {} at {:.4},{:.4}",
                request.station_id, request.lat, request.lng
            );

            let query = [
                ("lat", request.lat.to_string()),
                ("lon", request.lng.to_string()),
                ("units", request.units.as_str().to_string()),
                ("appid", api_key),
            ];

            let body = client.get(&url).query(&query).send().await?.text().await?;
            parse_response(&body, request.units)
        })
    }
}

/// Interpret a current-weather response body.
///
/// The API reports failures in-band with a `cod` field that may be a
/// number or a numeric string.
pub fn parse_response(body: &str, units: UnitSystem) -> Result<WeatherSnapshot, FetchError> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    let code = match value.get("cod") {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.parse::<i64>().ok(),
        _ => None,
    };

    if let Some(code) = code {
        if code != 200 {
            let message = value
                .get("message")
                .and_then(serde_json::Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Unknown error from API");
            return Err(FetchError::Rejected(message.to_string()));
        }
    }

    let payload: WeatherPayload = serde_json::from_value(value)?;
    payload.into_snapshot(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_response() {
        let body = r#"{
            "cod": 200,
            "name": "Mitte",
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky"}],
            "main": {"temp": 21.7, "feels_like": 21.1, "pressure": 1012, "humidity": 40}
        }"#;
        let snapshot = parse_response(body, UnitSystem::Metric).unwrap();
        assert_eq!(snapshot.location_name, "Mitte");
        assert!((snapshot.temperature - 21.7).abs() < 1e-9);
    }

    #[test]
    fn test_parse_string_error_code() {
        let body = r#"{"cod": "404", "message": "city not found"}"#;
        assert_eq!(
            parse_response(body, UnitSystem::Metric),
            Err(FetchError::Rejected("city not found".to_string()))
        );
    }

    #[test]
    fn test_parse_numeric_error_code_without_message() {
        let body = r#"{"cod": 401}"#;
        assert_eq!(
            parse_response(body, UnitSystem::Metric),
            Err(FetchError::Rejected("Unknown error from API".to_string()))
        );
    }
}
