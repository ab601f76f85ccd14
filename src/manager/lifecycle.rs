//! Per-module lifecycle tracking
//!
//! Transitions are one-way: `Discovered -> Instantiating -> Initialized ->
//! Connected`, with `FailedInit` and `FailedConnect` as terminal failure states.

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Discovered,
    Instantiating,
    Initialized,
    Connected,
    FailedInit,
    FailedConnect,
}

impl Lifecycle {
    pub(crate) fn can_transition_to(self, next: Lifecycle) -> bool {
        use Lifecycle::*;
        matches!(
            (self, next),
            (Discovered, Instantiating)
                | (Instantiating, Initialized)
                | (Instantiating, FailedInit)
                | (Initialized, Connected)
                | (Initialized, FailedConnect)
        )
    }

    /// Active modules take part in environment and command aggregation
    pub(crate) fn is_active(self) -> bool {
        matches!(
            self,
            Lifecycle::Initialized | Lifecycle::Connected | Lifecycle::FailedConnect
        )
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Lifecycle::Discovered => "discovered",
            Lifecycle::Instantiating => "instantiating",
            Lifecycle::Initialized => "initialized",
            Lifecycle::Connected => "connected",
            Lifecycle::FailedInit => "failed to initialize",
            Lifecycle::FailedConnect => "failed to connect",
        }
    }
}

/// Diagnostic summary of one module the manager attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub name: String,
    pub status: &'static str,
    pub active: bool,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
struct BoardEntry {
    name: String,
    state: Lifecycle,
    error: Option<String>,
}

/// Lifecycle of every module a manager attempted, in instantiation order
#[derive(Debug, Default)]
pub(crate) struct StatusBoard {
    entries: Vec<BoardEntry>,
}

impl StatusBoard {
    pub(crate) fn discover(&mut self, name: &str) {
        self.entries.push(BoardEntry {
            name: name.to_string(),
            state: Lifecycle::Discovered,
            error: None,
        });
    }

    pub(crate) fn advance(&mut self, name: &str, next: Lifecycle) {
        let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) else {
            warn!(module = %name, "Lifecycle update for unknown module");
            return;
        };
        debug_assert!(
            entry.state.can_transition_to(next),
            "invalid lifecycle transition {:?} -> {:?} for {}",
            entry.state,
            next,
            name
        );
        if entry.state.can_transition_to(next) {
            entry.state = next;
        }
    }

    pub(crate) fn fail(&mut self, name: &str, next: Lifecycle, error: String) {
        self.advance(name, next);
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.error = Some(error);
        }
    }

    pub(crate) fn state(&self, name: &str) -> Option<Lifecycle> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.state)
    }

    pub(crate) fn active_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.state.is_active())
            .map(|e| e.name.clone())
            .collect()
    }

    pub(crate) fn reports(&self) -> Vec<ModuleReport> {
        self.entries
            .iter()
            .map(|e| ModuleReport {
                name: e.name.clone(),
                status: e.state.label(),
                active: e.state.is_active(),
                connected: e.state == Lifecycle::Connected,
                error: e.error.clone(),
            })
            .collect()
    }
}
