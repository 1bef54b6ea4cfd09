//! Workers: the supervised units of the harness.
//!
//! ## Contents
//! - [`Worker`] async, cancelable unit; [`WorkerRef`] shared handle
//! - [`WorkerFn`] closure-backed worker
//! - [`WorkerSpec`] worker + restart/backoff/timeout
//! - [`ConsumerWorker`] drains a consumer group through a [`Handler`]
//! - [`ProducerWorker`] appends a fixed batch of entries
//!
//! ```text
//! ProducerWorker ── append ──► Streams ◄── request_new / request_own_pending / ack ── ConsumerWorker
//!                                                                                         │
//!                                                                                   Handler::handle
//! ```

mod consumer;
mod producer;
mod spec;
mod worker;
mod worker_fn;

pub use consumer::{ConsumerOptions, ConsumerWorker, Handler, HandlerFn, Outcome};
pub use producer::ProducerWorker;
pub use spec::WorkerSpec;
pub use worker::{Worker, WorkerRef};
pub use worker_fn::WorkerFn;
