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

//! Side effects requested by the controllers.
//!
//! Controllers never touch the network or the clock. They queue effects,
//! and whoever drives the session (see [`crate::runtime`]) executes them
//! and reports the outcome back as an event carrying the same ticket or
//! timer.

use std::time::Duration;

use crate::registry::StationId;
use crate::weather::WeatherRequest;

/// Identifies who a fetch result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ticket {
    /// The detail panel's fetch; only the latest `seq` is authoritative.
    Detail { seq: u64, station: StationId },
    /// One bookmark card, scoped to one visit of the bookmark list.
    Card { visit: u64, station: StationId },
}

/// Deferred work, routed to the controller that scheduled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    Camera(CameraTimer),
    Overlay(OverlayTimer),
}

/// Activation timers, tagged with the activation epoch that scheduled them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraTimer {
    /// Start the camera move for an activation.
    Move { epoch: u64 },
    /// Write the fragment for an activation whose camera has settled.
    PushFragment { epoch: u64 },
}

/// Overlay timers, tagged with the overlay generation that scheduled them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayTimer {
    /// Apply the overlay's active state once layout has settled.
    Settled { generation: u64 },
    /// Remove the overlay once its fade-out has finished.
    Removal { generation: u64 },
}

impl From<CameraTimer> for Timer {
    fn from(timer: CameraTimer) -> Self {
        Timer::Camera(timer)
    }
}

impl From<OverlayTimer> for Timer {
    fn from(timer: OverlayTimer) -> Self {
        Timer::Overlay(timer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch { ticket: Ticket, request: WeatherRequest },
    Schedule { delay: Duration, timer: Timer },
}

/// Queue of effects produced while handling one event.
#[derive(Debug, Default)]
pub struct Effects {
    queue: Vec<Effect>,
}

impl Effects {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch(&mut self, ticket: Ticket, request: WeatherRequest) {
        self.queue.push(Effect::Fetch { ticket, request });
    }

    pub fn schedule(&mut self, delay: Duration, timer: impl Into<Timer>) {
        self.queue.push(Effect::Schedule {
            delay,
            timer: timer.into(),
        });
    }

    /// Take everything queued so far.
    pub fn drain(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.queue)
    }

    #[must_use]
    pub fn pending(&self) -> &[Effect] {
        &self.queue
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
