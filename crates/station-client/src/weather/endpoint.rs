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

//! Fetcher for the hosting plugin's weather data endpoint.

use std::time::Duration;

use futures::future::BoxFuture;
use log::debug;
use serde::Deserialize;

use super::{FetchError, UnitSystem, WeatherFetcher, WeatherPayload, WeatherRequest, WeatherSnapshot};
use crate::config::Endpoint;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Response envelope used by the endpoint for both outcomes.
#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: serde_json::Value,
}

/// Posts form-encoded requests to the plugin endpoint.
#[derive(Debug, Clone)]
pub struct EndpointFetcher {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl EndpointFetcher {
    pub fn new(endpoint: Endpoint) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, endpoint })
    }
}

impl WeatherFetcher for EndpointFetcher {
    fn fetch(&self, request: WeatherRequest) -> BoxFuture<'static, Result<WeatherSnapshot, FetchError>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        Box::pin(async move {
            debug!(
                "Requesting weather for station {} ({})",
                request.station_id, request.units
            );

            let form = [
                ("action", endpoint.action.clone()),
                ("nonce", endpoint.token.clone()),
                ("station_id", request.station_id.to_string()),
                ("lat", request.lat.to_string()),
                ("lng", request.lng.to_string()),
                ("units", request.units.as_str().to_string()),
            ];

            let body = client
                .post(&endpoint.url)
                .form(&form)
                .send()
                .await?
                .text()
                .await?;

            parse_envelope(&body, request.units)
        })
    }
}

/// Interpret an endpoint response body.
pub fn parse_envelope(body: &str, units: UnitSystem) -> Result<WeatherSnapshot, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)?;

    if !envelope.success {
        let message = match envelope.data {
            serde_json::Value::String(text) if !text.is_empty() => text,
            serde_json::Value::Null | serde_json::Value::String(_) => "Unknown API error".to_string(),
            other => other.to_string(),
        };
        return Err(FetchError::Rejected(message));
    }

    let payload: WeatherPayload = serde_json::from_value(envelope.data)?;
    payload.into_snapshot(units)
}
