//! Connectivity signal.
//!
//! The engine never polls the network itself: something outside (the app's
//! HTTP probe, a platform callback) flips a [`ConnectivitySignal`] and the
//! sync manager reads it on every call.

use tokio::sync::watch;

pub trait Connectivity: Send + Sync {
    /// Current state. Read fresh on every call.
    fn is_online(&self) -> bool;

    /// Receiver that observes every online/offline transition.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// In-process connectivity flag backed by a `watch` channel.
#[derive(Debug)]
pub struct ConnectivitySignal {
    tx: watch::Sender<bool>,
}

impl ConnectivitySignal {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Publish a new state. Subscribers are only woken on an actual change.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            tracing::info!("connectivity changed: online={online}");
        }
    }
}

impl Default for ConnectivitySignal {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Connectivity for ConnectivitySignal {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
