//! Whether anyone is currently looking at the dashboard.
//!
//! The gate is a single-writer, many-reader flag. Pollers subscribe to it
//! and run no timers while it is `false`.

use std::sync::Arc;

use tokio::sync::watch;

/// Current gate value plus a counter bumped every time it turns `false`.
///
/// A poller remembers the generation when a fetch starts; if it differs
/// when the fetch returns, the dashboard was hidden in between and the
/// result is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub visible: bool,
    pub hidden_generation: u64,
}

/// Shared visibility flag. Clones share the same underlying channel.
#[derive(Debug, Clone)]
pub struct VisibilityGate {
    tx: Arc<watch::Sender<Visibility>>,
}

impl VisibilityGate {
    pub fn new(visible: bool) -> Self {
        let (tx, _) = watch::channel(Visibility {
            visible,
            hidden_generation: 0,
        });
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<Visibility> {
        self.tx.subscribe()
    }

    pub fn current_value(&self) -> bool {
        self.tx.borrow().visible
    }

    pub fn state(&self) -> Visibility {
        *self.tx.borrow()
    }

    /// Write the gate. Subscribers are only woken on an actual change.
    pub fn set_visible(&self, visible: bool) {
        let changed = self.tx.send_if_modified(|state| {
            if state.visible == visible {
                return false;
            }
            state.visible = visible;
            if !visible {
                state.hidden_generation += 1;
            }
            true
        });
        if changed {
            tracing::debug!(visible, "Dashboard visibility changed");
        }
    }
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self::new(true)
    }
}
