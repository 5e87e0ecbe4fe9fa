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

//! URL fragment access.

use std::sync::{Arc, Mutex, PoisonError};

use crate::registry::StationId;

/// The page location's fragment, as seen by the controllers.
///
/// Pushing or clearing must add a history entry without reloading the page,
/// and must not be reported back as a navigation event.
pub trait Location: Send {
    /// Current fragment without the leading `#`, if any.
    fn fragment(&self) -> Option<String>;

    fn push_fragment(&mut self, station: StationId);

    /// Return to the bare base path.
    fn clear_fragment(&mut self);
}

impl std::fmt::Debug for dyn Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Location")
            .field("fragment", &self.fragment())
            .finish()
    }
}

/// Parse a fragment the way the page does: optional `#`, optional leading
/// whitespace, then the longest run of decimal digits.
#[must_use]
pub fn parse_fragment(raw: &str) -> Option<StationId> {
    let trimmed = raw.strip_prefix('#').unwrap_or(raw).trim_start();
    let digits = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map_or("", |(end, c)| &trimmed[..end + c.len_utf8()]);

    digits.parse().ok().map(StationId)
}

#[derive(Debug, Default)]
struct HistoryInner {
    base_path: String,
    entries: Vec<Option<String>>,
}

/// History kept in memory; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocation {
    inner: Arc<Mutex<HistoryInner>>,
}

impl MemoryLocation {
    pub fn new(base_path: impl Into<String>, fragment: Option<&str>) -> Self {
        let inner = HistoryInner {
            base_path: base_path.into(),
            entries: vec![fragment.map(str::to_string)],
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Full URL of the current entry, e.g. `/stations/#7`.
    #[must_use]
    pub fn href(&self) -> String {
        let inner = self.lock();
        match inner.entries.last() {
            Some(Some(fragment)) => format!("{}#{}", inner.base_path, fragment),
            _ => inner.base_path.clone(),
        }
    }

    /// Number of history entries, the initial one included.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Move to a different fragment as the user would (typing or back/forward).
    /// The caller is responsible for reporting the navigation event.
    pub fn navigate(&self, fragment: Option<&str>) {
        self.lock().entries.push(fragment.map(str::to_string));
    }

    /// Step back one entry; returns the fragment now current.
    pub fn back(&self) -> Option<String> {
        let mut inner = self.lock();
        if inner.entries.len() > 1 {
            inner.entries.pop();
        }
        inner.entries.last().cloned().flatten()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HistoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Location for MemoryLocation {
    fn fragment(&self) -> Option<String> {
        self.lock().entries.last().cloned().flatten()
    }

    fn push_fragment(&mut self, station: StationId) {
        self.lock().entries.push(Some(station.to_string()));
    }

    fn clear_fragment(&mut self) {
        self.lock().entries.push(None);
    }
}
