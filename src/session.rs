//! Search sequencing
//!
//! Every search walks `Idle → Geocoding → FetchingWeather → Displayed |
//! Failed`. Showing a favorite starts at `FetchingWeather`. The committed
//! [`SessionState`] only changes when a fetch reaches `Displayed`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Geocoding,
    FetchingWeather,
    Displayed,
    Failed,
}

impl SearchPhase {
    /// Whether `next` may follow `self`
    #[must_use]
    pub fn can_advance_to(self, next: SearchPhase) -> bool {
        use SearchPhase::*;
        matches!(
            (self, next),
            (Idle, Geocoding)
                | (Idle, FetchingWeather)
                | (Geocoding, FetchingWeather)
                | (Geocoding, Failed)
                | (FetchingWeather, Displayed)
                | (FetchingWeather, Failed)
                | (Displayed, Idle)
                | (Failed, Idle)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SearchPhase::Displayed | SearchPhase::Failed)
    }
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchPhase::Idle => "idle",
            SearchPhase::Geocoding => "geocoding",
            SearchPhase::FetchingWeather => "fetching_weather",
            SearchPhase::Displayed => "displayed",
            SearchPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

static NEXT_SEARCH_ID: AtomicU64 = AtomicU64::new(1);

/// Phase tracker for one search. Searches may overlap; each has its own.
#[derive(Debug)]
pub struct SearchFlow {
    id: u64,
    phase: SearchPhase,
    history: Vec<SearchPhase>,
}

impl SearchFlow {
    pub fn start() -> Self {
        Self {
            id: NEXT_SEARCH_ID.fetch_add(1, Ordering::Relaxed),
            phase: SearchPhase::Idle,
            history: vec![SearchPhase::Idle],
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// Visited phases joined with arrows, e.g. `idle -> geocoding -> failed`
    #[must_use]
    pub fn trail(&self) -> String {
        self.history
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Move to `next`. Transitions outside the state machine are logged and
    /// ignored.
    pub fn advance(&mut self, next: SearchPhase) {
        if !self.phase.can_advance_to(next) {
            warn!(
                search = self.id,
                "Ignoring transition {} -> {}", self.phase, next
            );
            return;
        }
        debug!(search = self.id, "Search {} -> {}", self.phase, next);
        self.phase = next;
        self.history.push(next);
        if next.is_terminal() {
            info!(search = self.id, "Search ended: {}", self.trail());
        }
    }
}

/// The location currently on display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub current: Option<Location>,
}

impl SessionState {
    /// New state with `location` as the current one
    #[must_use]
    pub fn commit(self, location: Location) -> Self {
        Self {
            current: Some(location),
        }
    }
}

/// Shared holder of the committed session. Replaced wholesale on commit, so
/// the search that resolves last wins.
#[derive(Debug, Default)]
pub struct SessionCell {
    state: RwLock<SessionState>,
}

impl SessionCell {
    pub fn new(state: SessionState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Swap in a restored state
    pub fn replace(&self, state: SessionState) {
        *self.state.write() = state;
    }

    /// Commit `location` and return the new state
    pub fn commit(&self, location: Location) -> SessionState {
        let next = self.snapshot().commit(location);
        *self.state.write() = next.clone();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_successful_search_path() {
        let mut flow = SearchFlow::start();
        flow.advance(SearchPhase::Geocoding);
        flow.advance(SearchPhase::FetchingWeather);
        flow.advance(SearchPhase::Displayed);
        assert_eq!(
            flow.history,
            [
                SearchPhase::Idle,
                SearchPhase::Geocoding,
                SearchPhase::FetchingWeather,
                SearchPhase::Displayed
            ]
        );
        assert!(flow.phase().is_terminal());
    }

    #[test]
    fn test_geocoding_failure_never_fetches() {
        let mut flow = SearchFlow::start();
        flow.advance(SearchPhase::Geocoding);
        flow.advance(SearchPhase::Failed);
        flow.advance(SearchPhase::FetchingWeather);
        assert_eq!(flow.phase(), SearchPhase::Failed);
        assert!(!flow.history.contains(&SearchPhase::FetchingWeather));
    }

    #[test]
    fn test_trail_lists_visited_phases() {
        let mut flow = SearchFlow::start();
        flow.advance(SearchPhase::FetchingWeather);
        flow.advance(SearchPhase::Displayed);
        assert_eq!(flow.trail(), "idle -> fetching_weather -> displayed");
    }

    #[rstest]
    #[case(SearchPhase::Idle, SearchPhase::Displayed)]
    #[case(SearchPhase::Geocoding, SearchPhase::Displayed)]
    #[case(SearchPhase::Displayed, SearchPhase::Geocoding)]
    #[case(SearchPhase::Failed, SearchPhase::FetchingWeather)]
    fn test_illegal_transitions(#[case] from: SearchPhase, #[case] to: SearchPhase) {
        assert!(!from.can_advance_to(to));
    }

    #[test]
    fn test_search_ids_are_unique() {
        assert_ne!(SearchFlow::start().id(), SearchFlow::start().id());
    }

    #[test]
    fn test_last_commit_wins() {
        let cell = SessionCell::default();
        cell.commit(Location::new("Paris, France", 48.85, 2.35));
        cell.commit(Location::new("Oslo, Norway", 59.91, 10.75));
        assert_eq!(
            cell.snapshot().current.map(|l| l.display_name).as_deref(),
            Some("Oslo, Norway")
        );
    }
}
