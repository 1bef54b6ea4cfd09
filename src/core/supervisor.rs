//! # Supervisor: runs workers, fans out events, shuts down gracefully.
//!
//! The [`Supervisor`] owns the event [`Bus`], the [`SubscriberSet`] and the
//! alive tracker. Hand [`Supervisor::bus`] to
//! [`Streams::open_with_bus`](crate::Streams::open_with_bus) so protocol
//! events and worker events reach the same subscribers.
//!
//! ```text
//! Vec<WorkerSpec> ──► Supervisor::run / run_until
//!                        │
//!                        ├─► WorkerActor::run(child_token)   (one per spec, JoinSet)
//!                        │
//! Streams / actors ── publish ──► Bus ──► listener ──► AliveTracker::update
//!                                                 └──► SubscriberSet::emit
//!
//! Shutdown (OS signal or run_until token):
//!   publish ShutdownRequested → cancel runtime token → wait up to cfg.grace
//!     ├─ all joined → AllStoppedWithin
//!     └─ timeout    → GraceExceeded + RuntimeError::GraceExceeded { stuck }
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskstream::{
//!     Config, ConsumerOptions, ConsumerWorker, Entry, HandlerFn, LogWriter, MemoryLog,
//!     Outcome, Streams, Supervisor, WorkerSpec,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let sup = Supervisor::new(cfg.clone(), vec![Arc::new(LogWriter::new())]);
//!     let streams = Arc::new(Streams::open_with_bus(Arc::new(MemoryLog::new()), sup.bus().clone()));
//!
//!     let consumer = ConsumerWorker::arc(
//!         streams,
//!         ConsumerOptions::new("consumer-group-1", "consumer-1"),
//!         HandlerFn::new(|_e: Entry| async { Ok::<_, taskstream::WorkerError>(Outcome::Ack) }),
//!     );
//!     sup.run(vec![WorkerSpec::with_defaults(consumer, &cfg)]).await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::{actor::WorkerActor, alive::AliveTracker, config::Config, shutdown};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::workers::WorkerSpec;

/// Coordinates worker actors, event delivery and graceful shutdown.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    alive: Arc<AliveTracker>,
    listener: JoinHandle<()>,
}

impl Supervisor {
    /// Creates the supervisor and starts delivering bus events to `subscribers`.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let alive = Arc::new(AliveTracker::new());
        let subs = SubscriberSet::new(subscribers, bus.clone());
        let listener = Self::subscriber_listener(&bus, Arc::clone(&alive), subs);
        Self {
            cfg,
            bus,
            alive,
            listener,
        }
    }

    /// The bus every worker event is published on.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs `specs` until every worker exits, or until an OS termination
    /// signal triggers a graceful shutdown.
    pub async fn run(&self, specs: Vec<WorkerSpec>) -> Result<(), RuntimeError> {
        self.run_until(specs, CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), and also shuts down once `stop` is cancelled.
    pub async fn run_until(
        &self,
        specs: Vec<WorkerSpec>,
        stop: CancellationToken,
    ) -> Result<(), RuntimeError> {
        let runtime = CancellationToken::new();
        let mut set = JoinSet::new();
        for spec in specs {
            let actor = WorkerActor::new(spec, self.bus.clone());
            set.spawn(actor.run(runtime.child_token()));
        }
        self.drive_shutdown(&mut set, &runtime, &stop).await
    }

    fn subscriber_listener(
        bus: &Bus,
        alive: Arc<AliveTracker>,
        subs: SubscriberSet,
    ) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        subs.emit(&ev);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            subs.shutdown().await;
        })
    }

    async fn drive_shutdown(
        &self,
        set: &mut JoinSet<()>,
        runtime: &CancellationToken,
        stop: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        tokio::select! {
            Ok(()) = shutdown::wait_for_shutdown_signal() => {}
            _ = stop.cancelled() => {}
            _ = join_all(set) => return Ok(()),
        }

        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        runtime.cancel();
        self.wait_all_with_grace(set).await
    }

    async fn wait_all_with_grace(&self, set: &mut JoinSet<()>) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, join_all(set)).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.alive.snapshot().await;
                set.abort_all();
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn join_all(set: &mut JoinSet<()>) {
    while set.join_next().await.is_some() {}
}
