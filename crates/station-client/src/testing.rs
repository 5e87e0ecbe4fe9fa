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

//! Recording surfaces and fixtures shared by the unit tests.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use crate::bookmarks::MemoryStorage;
use crate::config::{Endpoint, SessionConfig};
use crate::effects::{Effect, Ticket, Timer};
use crate::location::MemoryLocation;
use crate::map::{FlyTo, MapSurface};
use crate::overlay::OverlaySurface;
use crate::registry::{LatLng, Station, StationId, StationRegistry};
use crate::session::{Event, Session, SessionParts};
use crate::weather::{FetchError, UnitSystem, WeatherRequest, WeatherSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MapCall {
    SetView(LatLng, f64),
    FlyTo(FlyTo),
    InvalidateSize,
    AddMarker(StationId),
    MarkerActive(StationId, bool),
    OpenPopup(StationId),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingMap {
    calls: Arc<Mutex<Vec<MapCall>>>,
}

impl RecordingMap {
    pub(crate) fn calls(&self) -> Vec<MapCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: MapCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

impl MapSurface for RecordingMap {
    fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.record(MapCall::SetView(center, zoom));
    }

    fn fly_to(&mut self, motion: &FlyTo) {
        self.record(MapCall::FlyTo(*motion));
    }

    fn invalidate_size(&mut self) {
        self.record(MapCall::InvalidateSize);
    }

    fn add_marker(&mut self, station: &Station) {
        self.record(MapCall::AddMarker(station.id));
    }

    fn set_marker_active(&mut self, station: StationId, active: bool) {
        self.record(MapCall::MarkerActive(station, active));
    }

    fn open_popup(&mut self, station: StationId) {
        self.record(MapCall::OpenPopup(station));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OverlayCall {
    Attach,
    SetActive(bool),
    Detach,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingOverlay {
    calls: Arc<Mutex<Vec<OverlayCall>>>,
}

impl RecordingOverlay {
    pub(crate) fn calls(&self) -> Vec<OverlayCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: OverlayCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

impl OverlaySurface for RecordingOverlay {
    fn attach(&mut self) {
        self.record(OverlayCall::Attach);
    }

    fn set_active(&mut self, active: bool) {
        self.record(OverlayCall::SetActive(active));
    }

    fn detach(&mut self) {
        self.record(OverlayCall::Detach);
    }
}

/// Oslo 1, Rome 2, Madrid 3, Berlin 7, Paris 9.
pub(crate) fn registry() -> StationRegistry {
    StationRegistry::new(vec![
        Station::new(1, "Oslo", 59.91, 10.75),
        Station::new(2, "Rome", 41.90, 12.50),
        Station::new(3, "Madrid", 40.42, -3.70),
        Station::new(7, "Berlin", 52.52, 13.40),
        Station::new(9, "Paris", 48.85, 2.35),
    ])
    .unwrap()
}

pub(crate) fn registry_config() -> Arc<SessionConfig> {
    Arc::new(SessionConfig::new(
        registry(),
        Endpoint::new("https://example.test/wp-admin/admin-ajax.php", "nonce-1"),
    ))
}

pub(crate) fn snapshot(name: &str, temperature: f64, units: UnitSystem) -> WeatherSnapshot {
    WeatherSnapshot {
        location_name: name.to_string(),
        condition_main: "Clouds".to_string(),
        condition_description: "broken clouds".to_string(),
        temperature,
        feels_like: temperature - 1.0,
        pressure: 1016.0,
        humidity: 71.0,
        units,
        fetched_at: Utc::now(),
    }
}

/// Handles onto the doubles inside a [`SessionParts`].
#[derive(Debug, Clone)]
pub(crate) struct Handles {
    pub(crate) storage: MemoryStorage,
    pub(crate) location: MemoryLocation,
    pub(crate) map: RecordingMap,
    pub(crate) overlay: RecordingOverlay,
}

pub(crate) fn parts(bookmarks: &[u64], fragment: Option<&str>) -> (SessionParts, Handles) {
    let ids: Vec<StationId> = bookmarks.iter().copied().map(StationId).collect();
    let handles = Handles {
        storage: MemoryStorage::with_ids(&ids),
        location: MemoryLocation::new("/weather/", fragment),
        map: RecordingMap::default(),
        overlay: RecordingOverlay::default(),
    };
    let parts = SessionParts {
        storage: Box::new(handles.storage.clone()),
        map: Box::new(handles.map.clone()),
        overlay: Box::new(handles.overlay.clone()),
        location: Box::new(handles.location.clone()),
    };
    (parts, handles)
}

/// A started session plus its doubles, with effects collected instead of
/// executed so a test decides when fetches resolve and timers fire.
#[derive(Debug)]
pub(crate) struct Harness {
    pub(crate) session: Session,
    pub(crate) storage: MemoryStorage,
    pub(crate) location: MemoryLocation,
    pub(crate) map: RecordingMap,
    pub(crate) overlay: RecordingOverlay,
    fetches: Vec<(Ticket, WeatherRequest)>,
    timers: Vec<Timer>,
}

pub(crate) fn harness(bookmarks: &[u64]) -> Harness {
    harness_at(bookmarks, None)
}

pub(crate) fn harness_at(bookmarks: &[u64], fragment: Option<&str>) -> Harness {
    let (parts, handles) = parts(bookmarks, fragment);
    let mut session = Session::new(registry_config(), parts, UnitSystem::Metric);
    session.start();

    let mut harness = Harness {
        session,
        storage: handles.storage,
        location: handles.location,
        map: handles.map,
        overlay: handles.overlay,
        fetches: Vec::new(),
        timers: Vec::new(),
    };
    harness.pump();
    harness
}

impl Harness {
    pub(crate) fn send(&mut self, event: Event) {
        self.session.handle(event);
        self.pump();
    }

    pub(crate) fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<WeatherSnapshot, FetchError>,
    ) {
        self.send(Event::FetchCompleted { ticket, result });
    }

    /// Fetches requested so far and not yet taken.
    pub(crate) fn take_fetches(&mut self) -> Vec<(Ticket, WeatherRequest)> {
        self.pump();
        std::mem::take(&mut self.fetches)
    }

    /// Id of the most recent camera flight.
    pub(crate) fn last_flight(&self) -> u64 {
        self.map
            .calls()
            .iter()
            .rev()
            .find_map(|call| match call {
                MapCall::FlyTo(motion) => Some(motion.flight),
                _ => None,
            })
            .unwrap()
    }

    /// Report the most recent camera flight as settled.
    pub(crate) fn settle_camera(&mut self) {
        let flight = self.last_flight();
        self.send(Event::CameraSettled { flight });
    }

    /// Fire every pending timer, including ones scheduled along the way, in
    /// the order they were scheduled.
    pub(crate) fn run_timers(&mut self) {
        while !self.timers.is_empty() {
            let timer = self.timers.remove(0);
            self.send(Event::TimerFired(timer));
        }
    }

    fn pump(&mut self) {
        for effect in self.session.take_effects() {
            match effect {
                Effect::Fetch { ticket, request } => self.fetches.push((ticket, request)),
                Effect::Schedule { timer, .. } => self.timers.push(timer),
            }
        }
    }
}
