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

//! The single translucent overlay drawn over the map.
//!
//! Both panels share one coordinator so there is never more than one
//! overlay element. Show and hide are idempotent; removal after a hide is
//! deferred until the fade finishes and is cancelled by a show arriving in
//! the meantime.

use std::time::Duration;

use log::debug;

use crate::effects::{Effects, OverlayTimer};

/// Delay between attaching the overlay and making it active, so the
/// transition has a starting state to animate from.
pub const OVERLAY_SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Must match the overlay's hide transition.
pub const OVERLAY_FADE_DURATION: Duration = Duration::from_millis(400);

/// Drawing primitives for the overlay element.
pub trait OverlaySurface: Send {
    fn attach(&mut self);
    fn set_active(&mut self, active: bool);
    fn detach(&mut self);
}

/// Lifecycle of the overlay element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Absent,
    /// Attached, waiting for layout before turning active.
    Entering,
    Active,
    /// Fading out; detached when the removal timer fires.
    Leaving,
}

pub struct OverlayCoordinator {
    surface: Box<dyn OverlaySurface>,
    phase: OverlayPhase,
    generation: u64,
}

impl std::fmt::Debug for OverlayCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayCoordinator")
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl OverlayCoordinator {
    #[must_use]
    pub fn new(surface: Box<dyn OverlaySurface>) -> Self {
        Self {
            surface,
            phase: OverlayPhase::Absent,
            generation: 0,
        }
    }

    #[must_use]
    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    /// Whether the overlay is (or is about to be) shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(self.phase, OverlayPhase::Entering | OverlayPhase::Active)
    }

    pub fn show(&mut self, effects: &mut Effects) {
        match self.phase {
            OverlayPhase::Absent => {
                self.surface.attach();
                self.generation += 1;
                self.phase = OverlayPhase::Entering;
                effects.schedule(
                    OVERLAY_SETTLE_DELAY,
                    OverlayTimer::Settled {
                        generation: self.generation,
                    },
                );
            }
            OverlayPhase::Leaving => {
                // Invalidate the pending removal.
                self.generation += 1;
                self.surface.set_active(true);
                self.phase = OverlayPhase::Active;
            }
            OverlayPhase::Entering | OverlayPhase::Active => {
                self.surface.set_active(true);
                self.phase = OverlayPhase::Active;
            }
        }
    }

    pub fn hide(&mut self, effects: &mut Effects) {
        match self.phase {
            OverlayPhase::Absent | OverlayPhase::Leaving => {}
            OverlayPhase::Entering | OverlayPhase::Active => {
                self.surface.set_active(false);
                self.generation += 1;
                self.phase = OverlayPhase::Leaving;
                effects.schedule(
                    OVERLAY_FADE_DURATION,
                    OverlayTimer::Removal {
                        generation: self.generation,
                    },
                );
            }
        }
    }

    /// Handle an overlay timer. Timers from an older generation are ignored.
    pub fn on_timer(&mut self, timer: OverlayTimer) {
        match timer {
            OverlayTimer::Settled { generation }
                if generation == self.generation && self.phase == OverlayPhase::Entering =>
            {
                self.surface.set_active(true);
                self.phase = OverlayPhase::Active;
            }
            OverlayTimer::Removal { generation }
                if generation == self.generation && self.phase == OverlayPhase::Leaving =>
            {
                self.surface.detach();
                self.phase = OverlayPhase::Absent;
            }
            OverlayTimer::Settled { .. } | OverlayTimer::Removal { .. } => {
                debug!("Ignoring superseded overlay timer {:?}", timer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{Effect, Timer};
    use crate::testing::{OverlayCall, RecordingOverlay};

    fn scheduled_timer(effects: &mut Effects) -> OverlayTimer {
        match effects.drain().pop() {
            Some(Effect::Schedule {
                timer: Timer::Overlay(timer),
                ..
            }) => timer,
            other => panic!("expected a scheduled timer, got {other:?}"),
        }
    }

    #[test]
    fn test_show_attaches_once_then_activates() {
        let surface = RecordingOverlay::default();
        let mut overlay = OverlayCoordinator::new(Box::new(surface.clone()));
        let mut effects = Effects::new();

        overlay.show(&mut effects);
        let settle = scheduled_timer(&mut effects);
        assert_eq!(overlay.phase(), OverlayPhase::Entering);

        overlay.on_timer(settle);
        overlay.show(&mut effects);

        assert_eq!(overlay.phase(), OverlayPhase::Active);
        assert_eq!(
            surface.calls(),
            vec![OverlayCall::Attach, OverlayCall::SetActive(true), OverlayCall::SetActive(true)]
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn test_hide_defers_detach() {
        let surface = RecordingOverlay::default();
        let mut overlay = OverlayCoordinator::new(Box::new(surface.clone()));
        let mut effects = Effects::new();

        overlay.show(&mut effects);
        overlay.on_timer(scheduled_timer(&mut effects));
        overlay.hide(&mut effects);
        overlay.hide(&mut effects);

        let removal = scheduled_timer(&mut effects);
        assert!(effects.is_empty());
        assert!(!overlay.is_visible());
        assert!(!surface.calls().contains(&OverlayCall::Detach));

        overlay.on_timer(removal);
        assert_eq!(overlay.phase(), OverlayPhase::Absent);
        assert_eq!(surface.calls().last(), Some(&OverlayCall::Detach));
    }

    #[test]
    fn test_show_during_fade_cancels_removal() {
        let surface = RecordingOverlay::default();
        let mut overlay = OverlayCoordinator::new(Box::new(surface.clone()));
        let mut effects = Effects::new();

        overlay.show(&mut effects);
        overlay.on_timer(scheduled_timer(&mut effects));
        overlay.hide(&mut effects);
        let removal = scheduled_timer(&mut effects);
        overlay.show(&mut effects);
        overlay.on_timer(removal);

        assert_eq!(overlay.phase(), OverlayPhase::Active);
        assert!(!surface.calls().contains(&OverlayCall::Detach));
        assert_eq!(surface.calls().iter().filter(|c| **c == OverlayCall::Attach).count(), 1);
    }
}
