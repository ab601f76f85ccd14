use std::sync::{Arc, RwLock, RwLockReadGuard, Weak};
use uuid::Uuid;

use super::lifecycle::{Lifecycle, StatusBoard};

/// Non-owning back-reference from a module to the manager that created it
///
/// Only the manager holds the status board strongly; once the manager is
/// dropped every query answers as if no module were active.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    manager_id: Uuid,
    board: Weak<RwLock<StatusBoard>>,
}

impl ManagerHandle {
    pub(crate) fn new(manager_id: Uuid, board: &Arc<RwLock<StatusBoard>>) -> Self {
        Self {
            manager_id,
            board: Arc::downgrade(board),
        }
    }

    pub fn manager_id(&self) -> Uuid {
        self.manager_id
    }

    /// Whether the owning manager still exists
    pub fn is_alive(&self) -> bool {
        self.board.strong_count() > 0
    }

    /// Module initialized successfully (connected or not)
    pub fn is_active(&self, name: &str) -> bool {
        self.state(name).is_some_and(Lifecycle::is_active)
    }

    /// Module completed the connection pass
    pub fn is_connected(&self, name: &str) -> bool {
        self.state(name) == Some(Lifecycle::Connected)
    }

    pub fn active_modules(&self) -> Vec<String> {
        self.with_board(|board| board.active_names())
            .unwrap_or_default()
    }

    fn state(&self, name: &str) -> Option<Lifecycle> {
        self.with_board(|board| board.state(name)).flatten()
    }

    fn with_board<T>(&self, f: impl FnOnce(&StatusBoard) -> T) -> Option<T> {
        let board = self.board.upgrade()?;
        let guard: RwLockReadGuard<'_, StatusBoard> =
            board.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(f(&guard))
    }
}
