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

//! Async driver for a [`Session`].
//!
//! The driver owns the session and processes one event at a time. Effects
//! queued while handling an event are executed as background tasks whose
//! outcome comes back through the same event channel. Cancelling the
//! driver's token stops the loop and every task it spawned.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::effects::Effect;
use crate::session::{Event, Session};
use crate::weather::WeatherFetcher;

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Create the channel that feeds a [`Driver`].
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

pub struct Driver {
    session: Session,
    fetcher: Arc<dyn WeatherFetcher>,
    events_tx: mpsc::WeakUnboundedSender<Event>,
    events_rx: EventReceiver,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("session", &self.session)
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Driver {
    /// The driver keeps only a weak handle to `sender`. Once every host
    /// sender is dropped, new effects are discarded and [`run`](Self::run)
    /// returns after the tasks already spawned have reported back. A host
    /// that wants the session to outlive its input keeps a sender until it
    /// cancels the driver.
    #[must_use]
    pub fn new(
        session: Session,
        fetcher: Arc<dyn WeatherFetcher>,
        sender: &EventSender,
        events: EventReceiver,
    ) -> Self {
        Self {
            session,
            fetcher,
            events_tx: sender.downgrade(),
            events_rx: events,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Token that stops the driver when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start the session and process events until the channel closes or
    /// the driver is cancelled. `on_change` runs after every handled event.
    pub async fn run<F>(mut self, mut on_change: F) -> Session
    where
        F: FnMut(&Session),
    {
        self.session.start();
        self.dispatch();
        on_change(&self.session);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("Session driver cancelled");
                    break;
                }
                event = self.events_rx.recv() => {
                    let Some(event) = event else {
                        info!("Event channel closed, stopping session driver");
                        break;
                    };
                    debug!("Handling {:?}", event);
                    self.session.handle(event);
                    self.dispatch();
                    on_change(&self.session);
                }
            }
        }

        self.cancel_token.cancel();
        self.session
    }

    fn dispatch(&mut self) {
        for effect in self.session.take_effects() {
            let Some(tx) = self.events_tx.upgrade() else {
                warn!("Event channel closed, dropping {:?}", effect);
                continue;
            };
            let cancel = self.cancel_token.clone();

            match effect {
                Effect::Fetch { ticket, request } => {
                    let fetch = self.fetcher.fetch(request);
                    tokio::spawn(async move {
                        tokio::select! {
                            () = cancel.cancelled() => {}
                            result = fetch => {
                                let _ = tx.send(Event::FetchCompleted { ticket, result });
                            }
                        }
                    });
                }
                Effect::Schedule { delay, timer } => {
                    tokio::spawn(async move {
                        tokio::select! {
                            () = cancel.cancelled() => {}
                            () = sleep(delay) => {
                                let _ = tx.send(Event::TimerFired(timer));
                            }
                        }
                    });
                }
            }
        }
    }
}
