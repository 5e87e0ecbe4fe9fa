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

//! One page session: every controller plus the shared environment.
//!
//! All user input, fetch results and timer expiries arrive as [`Event`]s
//! and are handled one at a time to completion. Handling an event never
//! blocks; fetches and delays are queued as effects for the driver.

use std::sync::Arc;

use log::debug;

use crate::activation::ActivationController;
use crate::bookmark_panel::BookmarkPanelController;
use crate::bookmarks::{BookmarkStorage, BookmarkStore};
use crate::config::SessionConfig;
use crate::effects::{Effect, Effects, Ticket, Timer};
use crate::location::Location;
use crate::map::{MapController, MapSurface};
use crate::overlay::{OverlayCoordinator, OverlaySurface};
use crate::registry::{LatLng, StationId};
use crate::view::{BookmarkListView, DetailView, SidebarContent, SidebarView};
use crate::weather::{FetchError, UnitSystem, WeatherSnapshot};

const TOGGLE_OPEN_LABEL: &str = "My Locations";
const TOGGLE_CLOSE_LABEL: &str = "Close";

/// Which panel owns the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelMode {
    #[default]
    MapDetail,
    BookmarkList,
}

/// Everything that can happen to a session.
#[derive(Debug, Clone)]
pub enum Event {
    MarkerClicked(StationId),
    /// Click on empty map; resolves to the nearest station.
    MapClicked(LatLng),
    /// The fragment changed outside the session (back/forward, manual edit).
    Navigated(Option<String>),
    UnitSelected(UnitSystem),
    /// The detail panel's bookmark button. Ignored while the bookmark list
    /// covers the detail panel.
    BookmarkButtonClicked,
    /// The detail panel's close button.
    CloseRequested,
    /// The "My Locations" / "Close" toggle.
    BookmarkListToggled,
    CardTitleClicked(StationId),
    CardRemoveClicked(StationId),
    FetchCompleted {
        ticket: Ticket,
        result: Result<WeatherSnapshot, FetchError>,
    },
    TimerFired(Timer),
    /// The map finished the camera animation started as `flight`.
    CameraSettled { flight: u64 },
}

/// State shared by the controllers.
#[derive(Debug)]
pub struct Env {
    pub(crate) config: Arc<SessionConfig>,
    pub(crate) bookmarks: BookmarkStore,
    pub(crate) map: MapController,
    pub(crate) overlay: OverlayCoordinator,
    pub(crate) location: Box<dyn Location>,
    pub(crate) effects: Effects,
}

/// Host-provided collaborators.
pub struct SessionParts {
    pub storage: Box<dyn BookmarkStorage>,
    pub map: Box<dyn MapSurface>,
    pub overlay: Box<dyn OverlaySurface>,
    pub location: Box<dyn Location>,
}

impl std::fmt::Debug for SessionParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionParts").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Session {
    env: Env,
    activation: ActivationController,
    panel: BookmarkPanelController,
    mode: PanelMode,
}

impl Session {
    /// Build a session: loads bookmarks and places the station markers.
    /// Call [`start`](Self::start) before feeding events.
    pub fn new(config: Arc<SessionConfig>, parts: SessionParts, unit: UnitSystem) -> Self {
        let map = MapController::new(parts.map, &config.registry);
        let env = Env {
            bookmarks: BookmarkStore::open(parts.storage),
            map,
            overlay: OverlayCoordinator::new(parts.overlay),
            location: parts.location,
            effects: Effects::new(),
            config,
        };

        Self {
            env,
            activation: ActivationController::new(unit),
            panel: BookmarkPanelController::new(),
            mode: PanelMode::MapDetail,
        }
    }

    /// Activate the station named by the fragment present at load.
    pub fn start(&mut self) {
        let fragment = self.env.location.fragment();
        debug!("Starting session at fragment {:?}", fragment);
        self.activation.navigate(&mut self.env, fragment.as_deref());
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::MarkerClicked(id) => {
                if let Some(id) = self.env.map.select_marker(id) {
                    self.activation.activate(&mut self.env, id);
                }
            }
            Event::MapClicked(point) => {
                let nearest =
                    MapController::find_nearest(&self.env.config.registry, point).map(|s| s.id);
                match nearest {
                    Some(id) => self.activation.activate(&mut self.env, id),
                    None => debug!("Map click with no stations registered"),
                }
            }
            Event::Navigated(fragment) => {
                self.activation.navigate(&mut self.env, fragment.as_deref());
            }
            Event::UnitSelected(unit) => self.activation.change_unit(&mut self.env, unit),
            Event::BookmarkButtonClicked => match self.mode {
                PanelMode::MapDetail => {
                    self.activation.toggle_bookmark(&mut self.env);
                }
                PanelMode::BookmarkList => {
                    debug!("Ignoring detail bookmark button while the list is open");
                }
            },
            Event::CloseRequested => self.activation.deactivate(&mut self.env),
            Event::BookmarkListToggled => self.toggle_bookmark_list(),
            Event::CardTitleClicked(id) => {
                self.panel.toggle_card(&mut self.env, id);
            }
            Event::CardRemoveClicked(id) => {
                self.panel.remove(&mut self.env, id);
            }
            Event::FetchCompleted { ticket, result } => match ticket {
                Ticket::Detail { seq, station } => self.activation.complete(seq, station, result),
                Ticket::Card { visit, station } => self.panel.complete(visit, station, result),
            },
            Event::TimerFired(timer) => match timer {
                Timer::Camera(timer) => self.activation.on_timer(&mut self.env, timer),
                Timer::Overlay(timer) => self.env.overlay.on_timer(timer),
            },
            Event::CameraSettled { flight } => {
                if self.env.map.camera_settled(flight) {
                    self.activation.camera_settled(&mut self.env, flight);
                }
            }
        }
    }

    fn toggle_bookmark_list(&mut self) {
        match self.mode {
            PanelMode::MapDetail => {
                self.mode = PanelMode::BookmarkList;
                self.panel.enter(&mut self.env, self.activation.unit());
            }
            PanelMode::BookmarkList => {
                self.mode = PanelMode::MapDetail;
                self.panel.exit(&mut self.env, &mut self.activation);
            }
        }
    }

    /// Effects queued since the last call.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        self.env.effects.drain()
    }

    #[must_use]
    pub fn mode(&self) -> PanelMode {
        self.mode
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.env.config
    }

    #[must_use]
    pub fn activation(&self) -> &ActivationController {
        &self.activation
    }

    #[must_use]
    pub fn panel(&self) -> &BookmarkPanelController {
        &self.panel
    }

    #[must_use]
    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.env.bookmarks
    }

    #[must_use]
    pub fn map(&self) -> &MapController {
        &self.env.map
    }

    #[must_use]
    pub fn overlay(&self) -> &OverlayCoordinator {
        &self.env.overlay
    }

    #[must_use]
    pub fn detail_view(&self) -> Option<DetailView> {
        self.activation.detail_view(&self.env)
    }

    /// What the sidebar should display right now.
    #[must_use]
    pub fn sidebar(&self) -> SidebarView {
        match self.mode {
            PanelMode::BookmarkList => SidebarView {
                toggle_label: TOGGLE_CLOSE_LABEL,
                content: SidebarContent::Bookmarks(
                    self.panel.view().unwrap_or(BookmarkListView::Empty),
                ),
            },
            PanelMode::MapDetail => SidebarView {
                toggle_label: TOGGLE_OPEN_LABEL,
                content: match self.detail_view() {
                    Some(detail) => SidebarContent::Detail(detail),
                    None => SidebarContent::Description(self.env.config.sidebar_description.clone()),
                },
            },
        }
    }
}
