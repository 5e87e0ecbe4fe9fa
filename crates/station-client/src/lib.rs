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

//! Interaction core for a map of weather stations.
//!
//! Stations are pinned on a map. Selecting one (marker, map click or URL
//! fragment) shows its current weather in a sidebar, and any station can be
//! bookmarked and later reviewed in a "My Locations" list. This crate holds
//! the controllers behind that page and leaves drawing to the host:
//!
//! - **Registry and config**: the station list and endpoint settings
//!   delivered with the page ([`StationRegistry`], [`SessionConfig`])
//! - **Weather layer**: one request per station through a [`WeatherFetcher`],
//!   either the site's own endpoint or `OpenWeatherMap` directly
//! - **Controllers**: activation, bookmark list, overlay and map, combined
//!   in a [`Session`] that handles one [`Event`] at a time
//! - **Runtime**: a tokio [`Driver`] that executes fetches and timers and
//!   feeds their outcome back to the session
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use station_client::{
//!     channel, Driver, EndpointFetcher, JsonFileStorage, MemoryLocation, Session,
//!     SessionConfig, SessionParts, UnitSystem,
//! };
//! # use station_client::{FlyTo, LatLng, MapSurface, OverlaySurface, Station, StationId};
//! # struct NoMap;
//! # impl MapSurface for NoMap {
//! #     fn set_view(&mut self, _: LatLng, _: f64) {}
//! #     fn fly_to(&mut self, _: &FlyTo) {}
//! #     fn invalidate_size(&mut self) {}
//! #     fn add_marker(&mut self, _: &Station) {}
//! #     fn set_marker_active(&mut self, _: StationId, _: bool) {}
//! #     fn open_popup(&mut self, _: StationId) {}
//! # }
//! # struct NoOverlay;
//! # impl OverlaySurface for NoOverlay {
//! #     fn attach(&mut self) {}
//! #     fn set_active(&mut self, _: bool) {}
//! #     fn detach(&mut self) {}
//! # }
//!
//! # async fn example(feed: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(SessionConfig::from_feed_json(feed)?);
//! let fetcher = Arc::new(EndpointFetcher::new(config.endpoint.clone())?);
//!
//! let parts = SessionParts {
//!     storage: Box::new(JsonFileStorage::new("bookmarks.json")),
//!     map: Box::new(NoMap),
//!     overlay: Box::new(NoOverlay),
//!     location: Box::new(MemoryLocation::new("/weather/", Some("7"))),
//! };
//! let session = Session::new(config, parts, UnitSystem::Metric);
//!
//! let (tx, rx) = channel();
//! let driver = Driver::new(session, fetcher, &tx, rx);
//! driver.run(|session| println!("{:?}", session.sidebar())).await;
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod bookmark_panel;
pub mod bookmarks;
pub mod config;
pub mod effects;
pub mod location;
pub mod map;
pub mod overlay;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod view;
pub mod weather;

#[cfg(test)]
mod testing;

pub use activation::{ActivationController, ActivationState};
pub use bookmark_panel::{BookmarkPanelController, Card, CardBody};
pub use bookmarks::{BookmarkStorage, BookmarkStore, JsonFileStorage, MemoryStorage, StorageError};
pub use config::{Endpoint, Icons, SessionConfig};
pub use effects::{CameraTimer, Effect, OverlayTimer, Ticket, Timer};
pub use location::{parse_fragment, Location, MemoryLocation};
pub use map::{FlyTo, MapController, MapSurface};
pub use overlay::{OverlayCoordinator, OverlayPhase, OverlaySurface};
pub use registry::{LatLng, RegistryError, Station, StationId, StationRegistry};
pub use runtime::{channel, Driver, EventReceiver, EventSender};
pub use session::{Event, PanelMode, Session, SessionParts};
pub use view::{BookmarkListView, DetailView, SidebarContent, SidebarView};
pub use weather::{
    EndpointFetcher, FetchError, OpenWeatherMapFetcher, UnitSystem, WeatherFetcher,
    WeatherRequest, WeatherSnapshot,
};
