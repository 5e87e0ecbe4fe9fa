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

//! Map viewport and station markers.
//!
//! Tile rendering and marker drawing belong to the mapping library behind
//! [`MapSurface`]. This module keeps the viewport state, the one marker per
//! station, the active-marker styling and nearest-station resolution.

use std::time::Duration;

use log::debug;

use crate::registry::{LatLng, Station, StationId, StationRegistry};

/// Initial view before any station is selected.
pub const DEFAULT_CENTER: LatLng = LatLng::new(51.505, -0.09);
pub const DEFAULT_ZOOM: f64 = 3.0;

/// Zoom used when a station is brought into view.
pub const STATION_ZOOM: f64 = 13.0;

const FLY_DURATION: Duration = Duration::from_millis(700);

/// Room left on the left for the sidebar during a fly-to, in pixels.
const SIDEBAR_PADDING: (f64, f64) = (300.0, 0.0);

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points using the Haversine formula (in km).
#[must_use]
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// An animated camera move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyTo {
    /// Identifies this flight in the matching
    /// [`Event::CameraSettled`](crate::session::Event::CameraSettled).
    pub flight: u64,
    pub center: LatLng,
    pub zoom: f64,
    pub duration: Duration,
    pub padding_top_left: (f64, f64),
}

/// Primitives provided by the mapping library.
///
/// After a [`fly_to`](MapSurface::fly_to) finishes, the host reports
/// [`Event::CameraSettled`](crate::session::Event::CameraSettled) carrying
/// the motion's `flight`. An interrupted flight may still report.
pub trait MapSurface: Send {
    fn set_view(&mut self, center: LatLng, zoom: f64);
    fn fly_to(&mut self, motion: &FlyTo);
    /// Recompute the map size after the surrounding layout changed.
    fn invalidate_size(&mut self);
    fn add_marker(&mut self, station: &Station);
    fn set_marker_active(&mut self, station: StationId, active: bool);
    fn open_popup(&mut self, station: StationId);
}

pub struct MapController {
    surface: Box<dyn MapSurface>,
    center: LatLng,
    zoom: f64,
    markers: Vec<StationId>,
    active_marker: Option<StationId>,
    popup: Option<StationId>,
    flight: Option<u64>,
}

impl std::fmt::Debug for MapController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapController")
            .field("center", &self.center)
            .field("zoom", &self.zoom)
            .field("markers", &self.markers.len())
            .field("active_marker", &self.active_marker)
            .finish_non_exhaustive()
    }
}

impl MapController {
    /// Set the initial view and place one marker per registered station.
    pub fn new(mut surface: Box<dyn MapSurface>, registry: &StationRegistry) -> Self {
        surface.set_view(DEFAULT_CENTER, DEFAULT_ZOOM);

        let mut map = Self {
            surface,
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            markers: Vec::with_capacity(registry.len()),
            active_marker: None,
            popup: None,
            flight: None,
        };

        for station in registry.all() {
            map.add_station(station);
        }
        map
    }

    pub fn add_station(&mut self, station: &Station) {
        if self.markers.contains(&station.id) {
            return;
        }
        self.surface.add_marker(station);
        self.markers.push(station.id);
    }

    #[must_use]
    pub fn has_marker(&self, id: StationId) -> bool {
        self.markers.contains(&id)
    }

    #[must_use]
    pub fn center(&self) -> LatLng {
        self.center
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn active_marker(&self) -> Option<StationId> {
        self.active_marker
    }

    #[must_use]
    pub fn popup(&self) -> Option<StationId> {
        self.popup
    }

    #[must_use]
    pub fn camera_in_flight(&self) -> bool {
        self.flight.is_some()
    }

    /// Animated move to a station, leaving room for the sidebar. `flight`
    /// replaces whatever flight was in progress.
    pub fn pan_to(&mut self, station: &Station, zoom: f64, flight: u64) {
        let motion = FlyTo {
            flight,
            center: station.position(),
            zoom,
            duration: FLY_DURATION,
            padding_top_left: SIDEBAR_PADDING,
        };

        self.surface.invalidate_size();
        self.surface.fly_to(&motion);
        self.center = motion.center;
        self.zoom = zoom;
        self.flight = Some(flight);
    }

    /// Record the end of `flight`. Returns false for a flight that was
    /// already replaced or settled.
    pub fn camera_settled(&mut self, flight: u64) -> bool {
        if self.flight != Some(flight) {
            debug!("Ignoring settle of camera flight {}", flight);
            return false;
        }
        self.flight = None;
        true
    }

    /// Jump to a station without animation.
    pub fn set_view(&mut self, station: &Station, zoom: f64) {
        self.surface.set_view(station.position(), zoom);
        self.center = station.position();
        self.zoom = zoom;
    }

    pub fn open_popup(&mut self, id: StationId) {
        if self.has_marker(id) {
            self.surface.open_popup(id);
            self.popup = Some(id);
        }
    }

    /// Move the active styling to `id`, releasing any previous marker.
    pub fn set_active_marker(&mut self, id: StationId) {
        if self.active_marker == Some(id) {
            return;
        }
        self.release_active_marker();
        if self.has_marker(id) {
            self.surface.set_marker_active(id, true);
            self.active_marker = Some(id);
        }
    }

    pub fn release_active_marker(&mut self) {
        if let Some(previous) = self.active_marker.take() {
            self.surface.set_marker_active(previous, false);
        }
    }

    /// Resolve a click on a marker to its station.
    #[must_use]
    pub fn select_marker(&self, id: StationId) -> Option<StationId> {
        if self.has_marker(id) {
            Some(id)
        } else {
            debug!("Click on unknown marker {}", id);
            None
        }
    }

    /// The closest station to `point`, however far away it is.
    #[must_use]
    pub fn find_nearest<'a>(registry: &'a StationRegistry, point: LatLng) -> Option<&'a Station> {
        registry
            .all()
            .iter()
            .map(|station| (station, haversine_km(point, station.position())))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(station, _)| station)
    }
}
