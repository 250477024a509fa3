//! Process-wide node status: `Starting -> Running -> Stopping`, never backward. Deliberately a
//! free-standing atomic rather than a field on the node struct, so a signal handler can advance
//! it to `Stopping` without holding (or racing to acquire) a handle to the node itself.

use std::sync::atomic::{AtomicU8, Ordering};

const STARTING: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;

static STATUS: AtomicU8 = AtomicU8::new(STARTING);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Starting,
    Running,
    Stopping,
}

impl From<u8> for NodeStatus {
    fn from(value: u8) -> Self {
        match value {
            STARTING => NodeStatus::Starting,
            RUNNING => NodeStatus::Running,
            _ => NodeStatus::Stopping,
        }
    }
}

/// Advances `cell` to `target`, unless it has already reached `target` or moved past it. Never
/// regresses: a racing `advance(&STATUS, RUNNING)` after `set_stopping()` has already fired is a
/// silent no-op rather than a step backward.
fn advance(cell: &AtomicU8, target: u8) {
    loop {
        let current = cell.load(Ordering::SeqCst);
        if current >= target {
            return;
        }
        if cell
            .compare_exchange(current, target, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return;
        }
    }
}

pub fn current() -> NodeStatus {
    NodeStatus::from(STATUS.load(Ordering::SeqCst))
}

pub fn set_running() {
    advance(&STATUS, RUNNING);
}

pub fn set_stopping() {
    advance(&STATUS, STOPPING);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_forward_only() {
        let cell = AtomicU8::new(STARTING);
        advance(&cell, RUNNING);
        assert_eq!(cell.load(Ordering::SeqCst), RUNNING);

        advance(&cell, STARTING);
        assert_eq!(
            cell.load(Ordering::SeqCst),
            RUNNING,
            "advancing to an earlier state must be a no-op"
        );

        advance(&cell, STOPPING);
        assert_eq!(cell.load(Ordering::SeqCst), STOPPING);
    }

    #[test]
    fn from_u8_maps_every_state() {
        assert_eq!(NodeStatus::from(STARTING), NodeStatus::Starting);
        assert_eq!(NodeStatus::from(RUNNING), NodeStatus::Running);
        assert_eq!(NodeStatus::from(STOPPING), NodeStatus::Stopping);
    }
}
