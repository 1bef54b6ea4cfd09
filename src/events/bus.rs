//! # Event bus.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] shared by the
//! [`Streams`](crate::Streams) context, the supervisor and worker actors.
//!
//! ```text
//! Publishers (many):                 Subscriber (one):
//!   Streams  ──┐
//!   Actor 1  ──┼──────► Bus ───────► subscriber_listener ────► SubscriberSet
//!   Actor N  ──┤  (broadcast chan)     (in Supervisor)
//!   Runner   ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - One bounded ring buffer is shared by all receivers; slow receivers get
//!   `RecvError::Lagged(n)` and skip `n` oldest items.
//! - Events published with no receiver are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus with the given capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(1024)
    }
}
