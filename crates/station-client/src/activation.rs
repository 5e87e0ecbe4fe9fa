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

//! Station activation state machine.
//!
//! Owns which station the detail panel shows and in what state. An
//! activation runs in three steps that must stay ordered:
//!
//! 1. the fetch is issued and the loading placeholder shown immediately,
//! 2. after [`CAMERA_DELAY`] the map flies to the station,
//! 3. once the camera reports it has settled, and [`FRAGMENT_DELAY`] later,
//!    the URL fragment is written.
//!
//! Fetch results are matched against the latest request sequence number;
//! anything older is dropped. Camera and fragment steps are tagged with an
//! activation epoch so a newer activation silently cancels them. The epoch
//! also names the camera flight, so a settle reported for an interrupted
//! flight is never credited to the one that replaced it.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::effects::{CameraTimer, Ticket};
use crate::location::parse_fragment;
use crate::map::STATION_ZOOM;
use crate::registry::{Station, StationId};
use crate::session::Env;
use crate::view::{unit_toggles, BookmarkButton, DetailView, WeatherFields};
use crate::weather::{FetchError, UnitSystem, WeatherRequest, WeatherSnapshot};

/// Lets the sidebar layout settle before the camera starts moving.
pub const CAMERA_DELAY: Duration = Duration::from_millis(150);

/// Pause between the camera settling and the fragment being written.
pub const FRAGMENT_DELAY: Duration = Duration::from_millis(200);

/// What the detail panel is showing.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationState {
    Idle,
    Loading(StationId),
    Active(StationId, WeatherSnapshot),
    Failed(StationId, String),
}

impl ActivationState {
    #[must_use]
    pub fn station(&self) -> Option<StationId> {
        match self {
            ActivationState::Idle => None,
            ActivationState::Loading(id)
            | ActivationState::Active(id, _)
            | ActivationState::Failed(id, _) => Some(*id),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            ActivationState::Active(_, snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ActivationController {
    state: ActivationState,
    unit: UnitSystem,
    /// Latest detail fetch issued; bumped by every activation and unit change.
    request_seq: u64,
    /// Bumped by every activation and deactivation.
    epoch: u64,
    /// Epoch whose camera move is in flight.
    camera_epoch: Option<u64>,
}

impl ActivationController {
    #[must_use]
    pub fn new(unit: UnitSystem) -> Self {
        Self {
            state: ActivationState::Idle,
            unit,
            request_seq: 0,
            epoch: 0,
            camera_epoch: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    #[must_use]
    pub fn unit(&self) -> UnitSystem {
        self.unit
    }

    #[must_use]
    pub fn station(&self) -> Option<StationId> {
        self.state.station()
    }

    /// Sequence number of the latest detail fetch.
    #[must_use]
    pub fn latest_request(&self) -> u64 {
        self.request_seq
    }

    /// Make `id` the displayed station. Unknown ids are ignored.
    pub fn activate(&mut self, env: &mut Env, id: StationId) {
        let config = Arc::clone(&env.config);
        let Some(station) = config.registry.find_by_id(id) else {
            debug!("Ignoring activation of unknown station {}", id);
            return;
        };

        info!("Activating station {} ({})", station.id, station.name);
        self.epoch += 1;
        self.camera_epoch = None;
        self.state = ActivationState::Loading(station.id);
        env.map.set_active_marker(station.id);
        self.request(env, station);
        env.effects
            .schedule(CAMERA_DELAY, CameraTimer::Move { epoch: self.epoch });
    }

    fn request(&mut self, env: &mut Env, station: &Station) {
        self.request_seq += 1;
        env.effects.fetch(
            Ticket::Detail {
                seq: self.request_seq,
                station: station.id,
            },
            WeatherRequest::for_station(station, self.unit),
        );
    }

    /// Apply a detail fetch result, unless a newer request superseded it.
    pub fn complete(
        &mut self,
        seq: u64,
        station: StationId,
        result: Result<WeatherSnapshot, FetchError>,
    ) {
        let awaiting = matches!(self.state, ActivationState::Loading(id) if id == station);
        if seq != self.request_seq || !awaiting {
            debug!(
                "Discarding stale weather for station {} (request {}, latest {})",
                station, seq, self.request_seq
            );
            return;
        }

        self.state = match result {
            Ok(snapshot) => ActivationState::Active(station, snapshot),
            Err(e) => {
                warn!("Weather fetch for station {} failed: {}", station, e);
                ActivationState::Failed(station, e.detail_message())
            }
        };
    }

    /// Switch the unit system, re-fetching the displayed station under it.
    pub fn change_unit(&mut self, env: &mut Env, unit: UnitSystem) {
        if unit == self.unit {
            return;
        }

        info!("Switching units to {}", unit);
        self.unit = unit;

        let Some(id) = self.station() else {
            return;
        };
        let config = Arc::clone(&env.config);
        if let Some(station) = config.registry.find_by_id(id) {
            self.state = ActivationState::Loading(id);
            self.request(env, station);
        }
    }

    /// Toggle the displayed station's bookmark. Returns the new membership,
    /// or `None` when nothing is displayed.
    pub fn toggle_bookmark(&mut self, env: &mut Env) -> Option<bool> {
        let id = self.station()?;
        let bookmarked = env.bookmarks.toggle(id);
        info!(
            "Station {} {}",
            id,
            if bookmarked { "bookmarked" } else { "unbookmarked" }
        );
        Some(bookmarked)
    }

    /// Return to `Idle`: clear the fragment, the panel and the marker styling.
    pub fn deactivate(&mut self, env: &mut Env) {
        if let Some(id) = self.station() {
            info!("Closing station {}", id);
        }

        self.state = ActivationState::Idle;
        self.epoch += 1;
        self.camera_epoch = None;

        if env.location.fragment().is_some() {
            env.location.clear_fragment();
        }
        env.map.release_active_marker();
    }

    /// React to an externally observed fragment change.
    ///
    /// A fragment naming the station already loading or shown is a no-op,
    /// so repeated navigation events never start duplicate fetches.
    pub fn navigate(&mut self, env: &mut Env, fragment: Option<&str>) {
        let target = fragment
            .and_then(parse_fragment)
            .filter(|&id| env.config.registry.contains(id));

        match target {
            Some(id) if self.is_showing(id) => {
                debug!("Navigation to station {} is already current", id);
            }
            Some(id) => self.activate(env, id),
            None => self.deactivate(env),
        }
    }

    fn is_showing(&self, id: StationId) -> bool {
        matches!(
            &self.state,
            ActivationState::Loading(s) | ActivationState::Active(s, _) if *s == id
        )
    }

    pub fn on_timer(&mut self, env: &mut Env, timer: CameraTimer) {
        match timer {
            CameraTimer::Move { epoch } => self.move_camera(env, epoch),
            CameraTimer::PushFragment { epoch } => self.push_fragment(env, epoch),
        }
    }

    fn move_camera(&mut self, env: &mut Env, epoch: u64) {
        if epoch != self.epoch {
            debug!("Skipping camera move for superseded activation");
            return;
        }
        let Some(id) = self.station() else {
            return;
        };
        let config = Arc::clone(&env.config);
        if let Some(station) = config.registry.find_by_id(id) {
            env.map.pan_to(station, STATION_ZOOM, epoch);
            self.camera_epoch = Some(epoch);
        }
    }

    /// The map finished the flight named `flight`. Only the flight started
    /// for the current activation leads to a fragment write.
    pub fn camera_settled(&mut self, env: &mut Env, flight: u64) {
        if self.camera_epoch != Some(flight) {
            debug!("Ignoring settle of superseded camera flight {}", flight);
            return;
        }
        self.camera_epoch = None;
        if flight == self.epoch {
            env.effects
                .schedule(FRAGMENT_DELAY, CameraTimer::PushFragment { epoch: flight });
        }
    }

    fn push_fragment(&mut self, env: &mut Env, epoch: u64) {
        if epoch != self.epoch {
            return;
        }
        let Some(id) = self.station() else {
            return;
        };
        // Arriving here through navigation means the fragment is already right.
        let current = env.location.fragment().as_deref().and_then(parse_fragment);
        if current != Some(id) {
            env.location.push_fragment(id);
        }
    }

    /// Restore the detail panel after the bookmark list closes.
    ///
    /// An active station re-renders from its held snapshot; a failed one has
    /// nothing to show and is fetched again. The fragment, which the list may
    /// have pointed elsewhere, is brought back in line with the state.
    pub fn resume(&mut self, env: &mut Env) {
        if let ActivationState::Failed(id, _) = self.state {
            let config = Arc::clone(&env.config);
            if let Some(station) = config.registry.find_by_id(id) {
                self.state = ActivationState::Loading(id);
                self.request(env, station);
            }
        }

        let current = env.location.fragment();
        match self.station() {
            Some(id) if current.as_deref().and_then(parse_fragment) != Some(id) => {
                env.location.push_fragment(id);
            }
            None if current.is_some() => env.location.clear_fragment(),
            _ => {}
        }
    }

    /// Project the state into the detail panel, `None` when idle.
    #[must_use]
    pub fn detail_view(&self, env: &Env) -> Option<DetailView> {
        match &self.state {
            ActivationState::Idle => None,
            ActivationState::Loading(id) => Some(DetailView::Loading { station: *id }),
            ActivationState::Active(id, snapshot) => Some(DetailView::Weather {
                station: *id,
                units: unit_toggles(self.unit),
                bookmark: BookmarkButton::new(*id, env.bookmarks.contains(*id), &env.config.icons),
                fields: WeatherFields::from_snapshot(snapshot),
            }),
            ActivationState::Failed(id, message) => Some(DetailView::Error {
                station: *id,
                message: format!("Failed to load weather data: {message}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::session::Event;
    use crate::testing::{harness, snapshot, MapCall};

    #[test]
    fn test_activate_unknown_station_is_noop() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(404)));
        assert_eq!(h.session.activation().state(), &ActivationState::Idle);
        assert!(h.take_fetches().is_empty());
    }

    #[test]
    fn test_activate_shows_loading_and_fetches_immediately() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));

        assert_eq!(h.session.activation().state(), &ActivationState::Loading(StationId(7)));
        let fetches = h.take_fetches();
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].1.station_id, StationId(7));
        assert_eq!(fetches[0].1.units, UnitSystem::Metric);
        assert_eq!(h.session.map().active_marker(), Some(StationId(7)));
        assert!(matches!(
            h.session.detail_view(),
            Some(DetailView::Loading { station: StationId(7) })
        ));
    }

    #[test]
    fn test_fragment_written_only_after_camera_settles() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));
        let fetches = h.take_fetches();
        h.complete(fetches[0].0, Ok(snapshot("Berlin", 12.0, UnitSystem::Metric)));

        assert!(h.map.calls().iter().all(|c| !matches!(c, MapCall::FlyTo(_))));
        h.run_timers();
        assert!(h.map.calls().iter().any(|c| matches!(c, MapCall::FlyTo(_))));
        assert_eq!(h.location.fragment(), None);

        h.settle_camera();
        assert_eq!(h.location.fragment(), None);
        h.run_timers();
        assert_eq!(h.location.fragment().as_deref(), Some("7"));
    }

    #[test]
    fn test_superseded_activation_skips_camera_and_fragment() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));
        h.send(Event::MarkerClicked(StationId(9)));
        h.run_timers();

        let flights: Vec<MapCall> = h
            .map
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MapCall::FlyTo(_)))
            .collect();
        assert_eq!(flights.len(), 1);
        assert!(matches!(&flights[0], MapCall::FlyTo(motion) if (motion.center.lat - 48.85).abs() < 1e-9));

        h.settle_camera();
        h.run_timers();
        assert_eq!(h.location.fragment().as_deref(), Some("9"));
    }

    #[test]
    fn test_settle_of_interrupted_flight_does_not_write_fragment() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));
        h.run_timers();
        let berlin = h.last_flight();
        h.send(Event::MarkerClicked(StationId(9)));
        h.run_timers();
        assert_ne!(h.last_flight(), berlin);

        // Berlin's flight lands while Paris's is still under way.
        h.send(Event::CameraSettled { flight: berlin });
        h.run_timers();
        assert_eq!(h.location.fragment(), None);
        assert!(h.session.map().camera_in_flight());

        h.settle_camera();
        h.run_timers();
        assert_eq!(h.location.fragment().as_deref(), Some("9"));
        assert_eq!(h.location.history_len(), 2);
    }

    #[test]
    fn test_rejected_fetch_reads_as_network_error() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));
        let fetches = h.take_fetches();
        h.complete(fetches[0].0, Err(FetchError::Rejected("Invalid nonce".to_string())));

        match h.session.detail_view() {
            Some(DetailView::Error { message, .. }) => {
                assert_eq!(message, "Failed to load weather data: Network error: Invalid nonce");
            }
            other => panic!("expected error view, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_renders_inline_error() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));
        let fetches = h.take_fetches();
        h.complete(fetches[0].0, Err(FetchError::Network("connection reset".to_string())));

        assert_eq!(
            h.session.activation().state(),
            &ActivationState::Failed(StationId(7), "Network error: connection reset".to_string())
        );
        match h.session.detail_view() {
            Some(DetailView::Error { message, .. }) => {
                assert_eq!(message, "Failed to load weather data: Network error: connection reset");
            }
            other => panic!("expected error view, got {other:?}"),
        }
        assert!(h.take_fetches().is_empty());
    }

    #[test]
    fn test_same_unit_is_noop() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));
        h.take_fetches();
        h.send(Event::UnitSelected(UnitSystem::Metric));
        assert!(h.take_fetches().is_empty());
    }

    #[test]
    fn test_unit_change_while_idle_only_updates_preference() {
        let mut h = harness(&[]);
        h.send(Event::UnitSelected(UnitSystem::Imperial));
        assert_eq!(h.session.activation().unit(), UnitSystem::Imperial);
        assert!(h.take_fetches().is_empty());
    }

    #[test]
    fn test_unit_change_after_failure_refetches() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));
        let fetches = h.take_fetches();
        h.complete(fetches[0].0, Err(FetchError::Rejected("Invalid nonce".to_string())));

        h.send(Event::UnitSelected(UnitSystem::Imperial));
        let fetches = h.take_fetches();
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].1.units, UnitSystem::Imperial);
        assert_eq!(h.session.activation().state(), &ActivationState::Loading(StationId(7)));
    }

    #[test]
    fn test_toggle_bookmark_while_idle_is_noop() {
        let mut h = harness(&[]);
        h.send(Event::BookmarkButtonClicked);
        assert_eq!(h.storage.saves(), 0);
    }

    #[test]
    fn test_navigation_to_current_station_does_not_refetch() {
        let mut h = harness(&[]);
        h.send(Event::Navigated(Some("#7".to_string())));
        assert_eq!(h.take_fetches().len(), 1);

        h.send(Event::Navigated(Some("#7".to_string())));
        h.send(Event::Navigated(Some("7".to_string())));
        assert!(h.take_fetches().is_empty());
        assert_eq!(h.session.activation().state(), &ActivationState::Loading(StationId(7)));
    }

    #[test]
    fn test_navigation_to_unknown_station_deactivates() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));
        h.send(Event::Navigated(Some("#999".to_string())));
        assert_eq!(h.session.activation().state(), &ActivationState::Idle);

        h.send(Event::MarkerClicked(StationId(7)));
        h.send(Event::Navigated(Some("#abc".to_string())));
        assert_eq!(h.session.activation().state(), &ActivationState::Idle);
    }

    #[test]
    fn test_result_after_deactivate_is_dropped() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));
        let fetches = h.take_fetches();
        h.send(Event::CloseRequested);
        h.complete(fetches[0].0, Ok(snapshot("Berlin", 12.0, UnitSystem::Metric)));
        assert_eq!(h.session.activation().state(), &ActivationState::Idle);
    }

    #[test]
    fn test_ticket_carries_station_and_sequence() {
        let mut h = harness(&[]);
        h.send(Event::MarkerClicked(StationId(7)));
        h.send(Event::MarkerClicked(StationId(9)));
        let tickets: Vec<Ticket> = h.take_fetches().into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            tickets,
            vec![
                Ticket::Detail { seq: 1, station: StationId(7) },
                Ticket::Detail { seq: 2, station: StationId(9) },
            ]
        );
    }
}
