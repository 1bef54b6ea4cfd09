//! # Event subscribers.
//!
//! ```text
//! Streams / Actors ── publish(Event) ──► Bus ──► Supervisor listener
//!                                                     │
//!                                                     ├──► AliveTracker (internal)
//!                                                     └──► SubscriberSet::emit(&Event)
//!                                                              ┌────┴────┬─────────┐
//!                                                              ▼         ▼         ▼
//!                                                          LogWriter  Metrics   Custom
//! ```
//!
//! - [`Subscribe`] the extension trait
//! - [`SubscriberSet`] non-blocking fan-out with per-subscriber queues
//! - [`LogWriter`] built-in subscriber rendering events through `tracing`

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
