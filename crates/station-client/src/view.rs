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

//! View models for the sidebar.
//!
//! Everything here is a pure projection of controller state. A host renders
//! the whole [`SidebarView`] after each event and binds its handlers to the
//! freshly rendered content, so no stale listeners survive a render.

use crate::config::Icons;
use crate::registry::StationId;
use crate::weather::{UnitSystem, WeatherSnapshot};

pub const LOADING_TEXT: &str = "Loading weather data...";
pub const EMPTY_TITLE: &str = "No saved locations yet";
pub const EMPTY_HINT: &str = "Click the bookmark icon on any weather station to save it here";

const FALLBACK_LOCATION: &str = "Weather Station";

/// Formatted reading, ready to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherFields {
    pub location_name: String,
    pub condition: String,
    pub temperature: String,
    pub pressure: String,
    pub humidity: String,
}

impl WeatherFields {
    #[must_use]
    pub fn from_snapshot(snapshot: &WeatherSnapshot) -> Self {
        let symbol = snapshot.units.temperature_symbol();
        let location_name = if snapshot.location_name.trim().is_empty() {
            FALLBACK_LOCATION.to_string()
        } else {
            snapshot.location_name.clone()
        };

        Self {
            location_name,
            condition: format!(
                "{} - {}",
                snapshot.condition_main, snapshot.condition_description
            ),
            temperature: format!(
                "{}{symbol} / Feels like {}{symbol}",
                whole_degrees(snapshot.temperature),
                whole_degrees(snapshot.feels_like)
            ),
            pressure: format!("{} hPa", snapshot.pressure),
            humidity: format!("{}%", snapshot.humidity),
        }
    }
}

// Halves round up, and a negative zero prints as 0.
fn whole_degrees(value: f64) -> f64 {
    (value + 0.5).floor() + 0.0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitToggle {
    pub unit: UnitSystem,
    pub label: &'static str,
    pub active: bool,
}

#[must_use]
pub fn unit_toggles(current: UnitSystem) -> [UnitToggle; 2] {
    UnitSystem::ALL.map(|unit| UnitToggle {
        unit,
        label: unit.label(),
        active: unit == current,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkButton {
    pub station: StationId,
    pub bookmarked: bool,
    pub icon: String,
    pub alt: &'static str,
}

impl BookmarkButton {
    #[must_use]
    pub fn new(station: StationId, bookmarked: bool, icons: &Icons) -> Self {
        let (icon, alt) = if bookmarked {
            (icons.bookmark_filled.clone(), "Bookmarked")
        } else {
            (icons.bookmark.clone(), "Bookmark")
        };
        Self {
            station,
            bookmarked,
            icon,
            alt,
        }
    }
}

/// Single-station detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailView {
    Loading {
        station: StationId,
    },
    Weather {
        station: StationId,
        units: [UnitToggle; 2],
        bookmark: BookmarkButton,
        fields: WeatherFields,
    },
    Error {
        station: StationId,
        message: String,
    },
}

impl DetailView {
    #[must_use]
    pub fn station(&self) -> StationId {
        match self {
            DetailView::Loading { station }
            | DetailView::Weather { station, .. }
            | DetailView::Error { station, .. } => *station,
        }
    }
}

/// Visual affordance of a bookmark card relative to its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardMarking {
    /// No card is expanded.
    Neutral,
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardBodyView {
    Loading,
    Weather(WeatherFields),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub station: StationId,
    pub title: String,
    pub body: CardBodyView,
    pub expanded: bool,
    pub marking: CardMarking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkListView {
    Empty,
    Cards(Vec<CardView>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarContent {
    /// Nothing selected: the host's description, if it supplied one.
    Description(Option<String>),
    Detail(DetailView),
    Bookmarks(BookmarkListView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarView {
    /// Label of the "My Locations" toggle.
    pub toggle_label: &'static str,
    pub content: SidebarContent,
}
