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

//! Session-wide configuration.
//!
//! Everything the host hands over at startup lives in one
//! [`SessionConfig`], built once and shared by `Arc` with every component
//! that needs it.

use serde::{Deserialize, Serialize};

use crate::registry::{RegistryError, Station, StationRegistry};

/// Default action name understood by the plugin endpoint.
pub const DEFAULT_ACTION: &str = "get_weather_data";

/// Weather data endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// URL the form-encoded request is posted to.
    pub url: String,
    /// Token scoped to the endpoint, sent as `nonce`.
    pub token: String,
    #[serde(default = "default_action")]
    pub action: String,
}

fn default_action() -> String {
    DEFAULT_ACTION.to_string()
}

impl Endpoint {
    #[must_use]
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            action: default_action(),
        }
    }
}

/// Bookmark icon assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icons {
    pub bookmark: String,
    pub bookmark_filled: String,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            bookmark: "bookmark.svg".to_string(),
            bookmark_filled: "bookmark-filled.svg".to_string(),
        }
    }
}

/// Raw data feed object as the plugin localizes it into the page.
#[derive(Debug, Deserialize)]
struct FeedData {
    stations: Vec<Station>,
    #[serde(rename = "ajaxurl", default)]
    endpoint_url: String,
    #[serde(rename = "nonce", default)]
    token: String,
    #[serde(default)]
    bookmark_icon: Option<String>,
    #[serde(default)]
    bookmark_filled_icon: Option<String>,
    #[serde(default)]
    sidebar_description: Option<String>,
}

/// Process-wide configuration for one page session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub registry: StationRegistry,
    pub endpoint: Endpoint,
    pub icons: Icons,
    /// HTML fragment shown while nothing is selected.
    pub sidebar_description: Option<String>,
}

impl SessionConfig {
    #[must_use]
    pub fn new(registry: StationRegistry, endpoint: Endpoint) -> Self {
        Self {
            registry,
            endpoint,
            icons: Icons::default(),
            sidebar_description: None,
        }
    }

    #[must_use]
    pub fn with_icons(mut self, icons: Icons) -> Self {
        self.icons = icons;
        self
    }

    #[must_use]
    pub fn with_sidebar_description(mut self, html: impl Into<String>) -> Self {
        self.sidebar_description = Some(html.into());
        self
    }

    /// Parse the plugin's data feed object.
    pub fn from_feed_json(json: &str) -> Result<Self, RegistryError> {
        let feed: FeedData = serde_json::from_str(json)?;
        let registry = StationRegistry::new(feed.stations)?;
        let defaults = Icons::default();

        Ok(Self {
            registry,
            endpoint: Endpoint::new(feed.endpoint_url, feed.token),
            icons: Icons {
                bookmark: feed.bookmark_icon.unwrap_or(defaults.bookmark),
                bookmark_filled: feed.bookmark_filled_icon.unwrap_or(defaults.bookmark_filled),
            },
            sidebar_description: feed.sidebar_description.filter(|html| !html.trim().is_empty()),
        })
    }
}
