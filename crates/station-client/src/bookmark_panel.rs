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

//! The "My Locations" list of bookmarked stations.
//!
//! Opening the list renders one placeholder card per bookmark straight
//! away and starts one fetch per card. Each result lands on its own card
//! whenever it arrives; a failure only affects that card. A result that
//! arrives after the list was closed is dropped. One requested by an
//! earlier visit may still fill a card of the current visit, provided the
//! card is still loading and the reading is in the units the current visit
//! asked for.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::activation::ActivationController;
use crate::effects::Ticket;
use crate::map::STATION_ZOOM;
use crate::registry::{Station, StationId};
use crate::session::Env;
use crate::view::{BookmarkListView, CardBodyView, CardMarking, CardView, WeatherFields};
use crate::weather::{FetchError, UnitSystem, WeatherRequest, WeatherSnapshot};

const PLACEHOLDER_TITLE: &str = "Loading...";
const UNKNOWN_TITLE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub enum CardBody {
    Loading,
    Ready(WeatherSnapshot),
    Failed(String),
}

/// One bookmarked station in the open list.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub station: Station,
    pub title: String,
    pub body: CardBody,
    pub expanded: bool,
}

impl Card {
    fn placeholder(station: Station) -> Self {
        let title = if station.name.trim().is_empty() {
            PLACEHOLDER_TITLE.to_string()
        } else {
            station.name.clone()
        };
        Self {
            station,
            title,
            body: CardBody::Loading,
            expanded: false,
        }
    }
}

fn failure_text(err: &FetchError) -> &'static str {
    match err {
        FetchError::Rejected(_) => "Failed to load data",
        FetchError::Network(_) | FetchError::Decode(_) => "Network error",
    }
}

#[derive(Debug, Default)]
pub struct BookmarkPanelController {
    visit: u64,
    /// Units the current visit fetched with.
    units: UnitSystem,
    /// `None` while the list is closed.
    cards: Option<Vec<Card>>,
}

impl BookmarkPanelController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.cards.is_some()
    }

    #[must_use]
    pub fn visit(&self) -> u64 {
        self.visit
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        self.cards.as_deref().unwrap_or_default()
    }

    /// Open the list: placeholder cards now, one fetch per card.
    pub fn enter(&mut self, env: &mut Env, units: UnitSystem) {
        self.visit += 1;
        self.units = units;

        let config = Arc::clone(&env.config);
        let cards: Vec<Card> = env
            .bookmarks
            .list()
            .iter()
            .filter_map(|&id| {
                let station = config.registry.find_by_id(id);
                if station.is_none() {
                    debug!("Skipping bookmark for unknown station {}", id);
                }
                station
            })
            .map(|station| Card::placeholder(station.clone()))
            .collect();

        info!("Opening bookmark list with {} stations", cards.len());
        for card in &cards {
            env.effects.fetch(
                Ticket::Card {
                    visit: self.visit,
                    station: card.station.id,
                },
                WeatherRequest::for_station(&card.station, units),
            );
        }

        self.cards = Some(cards);
        env.overlay.show(&mut env.effects);
    }

    /// Close the list and hand the sidebar back to the detail panel.
    pub fn exit(&mut self, env: &mut Env, activation: &mut ActivationController) {
        if self.cards.take().is_none() {
            return;
        }

        info!("Closing bookmark list");
        env.overlay.hide(&mut env.effects);
        activation.resume(env);
    }

    /// Apply one card's fetch result.
    pub fn complete(
        &mut self,
        visit: u64,
        station: StationId,
        result: Result<WeatherSnapshot, FetchError>,
    ) {
        let units = self.units;
        let Some(card) = self
            .cards
            .as_mut()
            .and_then(|cards| cards.iter_mut().find(|card| card.station.id == station))
        else {
            debug!("No bookmark card for station {}", station);
            return;
        };

        if visit != self.visit {
            let fills_placeholder = card.body == CardBody::Loading
                && matches!(&result, Ok(snapshot) if snapshot.units == units);
            if !fills_placeholder {
                debug!(
                    "Discarding weather for station {} from bookmark visit {}",
                    station, visit
                );
                return;
            }
        }

        match result {
            Ok(snapshot) => {
                card.title = if snapshot.location_name.trim().is_empty() {
                    UNKNOWN_TITLE.to_string()
                } else {
                    snapshot.location_name.clone()
                };
                card.body = CardBody::Ready(snapshot);
            }
            Err(e) => {
                warn!("Bookmark weather for station {} failed: {}", station, e);
                card.body = CardBody::Failed(failure_text(&e).to_string());
            }
        }
    }

    /// Expand or collapse a card. At most one card is expanded; expanding
    /// one collapses its siblings, centres the map on the station and opens
    /// its popup. Returns the card's new expanded state.
    pub fn toggle_card(&mut self, env: &mut Env, station: StationId) -> Option<bool> {
        let cards = self.cards.as_mut()?;
        let index = cards.iter().position(|card| card.station.id == station)?;

        if cards[index].expanded {
            cards[index].expanded = false;
            env.overlay.show(&mut env.effects);
            return Some(false);
        }

        for (i, card) in cards.iter_mut().enumerate() {
            card.expanded = i == index;
        }
        let target = &cards[index].station;
        debug!("Expanding bookmark card for station {}", target.id);

        env.overlay.hide(&mut env.effects);
        env.map.set_view(target, STATION_ZOOM);
        env.map.open_popup(target.id);
        env.location.push_fragment(target.id);
        Some(true)
    }

    /// Remove a bookmark from storage and drop its card.
    pub fn remove(&mut self, env: &mut Env, station: StationId) -> bool {
        let removed = env.bookmarks.remove(station);

        if let Some(cards) = self.cards.as_mut() {
            if let Some(index) = cards.iter().position(|card| card.station.id == station) {
                if cards.remove(index).expanded {
                    env.overlay.show(&mut env.effects);
                }
            }
        }
        removed
    }

    /// Project the open list, `None` while closed.
    #[must_use]
    pub fn view(&self) -> Option<BookmarkListView> {
        let cards = self.cards.as_ref()?;
        if cards.is_empty() {
            return Some(BookmarkListView::Empty);
        }

        let any_expanded = cards.iter().any(|card| card.expanded);
        let views = cards
            .iter()
            .map(|card| CardView {
                station: card.station.id,
                title: card.title.clone(),
                body: match &card.body {
                    CardBody::Loading => CardBodyView::Loading,
                    CardBody::Ready(snapshot) => {
                        CardBodyView::Weather(WeatherFields::from_snapshot(snapshot))
                    }
                    CardBody::Failed(message) => CardBodyView::Error(message.clone()),
                },
                expanded: card.expanded,
                marking: match (any_expanded, card.expanded) {
                    (false, _) => CardMarking::Neutral,
                    (true, true) => CardMarking::Active,
                    (true, false) => CardMarking::Inactive,
                },
            })
            .collect();
        Some(BookmarkListView::Cards(views))
    }
}
