//! Producer + three consumers sharing one consumer group.
//!
//! Consumers sometimes "forget" to acknowledge an entry; those entries stay
//! pending and come back to the same consumer once it runs out of new work.
//!
//! ```text
//! RUST_LOG=info cargo run --example consumer_group
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use taskstream::{
    Block, Config, ConsumerOptions, ConsumerWorker, Entry, Fields, HandlerFn, LogWriter,
    MemoryLog, Outcome, ProducerWorker, StartId, Streams, Supervisor, WorkerError, WorkerRef,
    WorkerSpec,
};

const GROUP: &str = "consumer-group-1";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config {
        grace: Duration::from_secs(5),
        ..Config::default()
    };
    let sup = Supervisor::new(cfg.clone(), vec![Arc::new(LogWriter::new())]);
    let streams = Arc::new(Streams::open_with_bus(
        Arc::new(MemoryLog::new()),
        sup.bus().clone(),
    ));

    let jobs: Vec<Fields> = (0..20)
        .map(|i| Fields::from([("worker_id", (2000 + i).to_string())]))
        .collect();
    let producer: WorkerRef = ProducerWorker::new("producer", Arc::clone(&streams), jobs)
        .with_interval(Duration::from_millis(100))
        .arc();
    let mut specs = vec![WorkerSpec::with_defaults(producer, &cfg)];

    for n in 1..=3 {
        let opts = ConsumerOptions::new(GROUP, format!("consumer-{n}"))
            .with_start(StartId::BEGINNING)
            .with_block(Block::millis(2000));
        let handler = HandlerFn::new(|entry: Entry| async move {
            let millis = 50 + rand::random_range(0..150);
            tokio::time::sleep(Duration::from_millis(millis)).await;
            tracing::info!(entry = %entry.id(), worker_id = ?entry.get("worker_id"), "processed");
            if rand::random_bool(0.2) {
                Ok::<_, WorkerError>(Outcome::Leave)
            } else {
                Ok(Outcome::Ack)
            }
        });
        let consumer: WorkerRef = ConsumerWorker::arc(Arc::clone(&streams), opts, handler);
        specs.push(WorkerSpec::with_defaults(consumer, &cfg));
    }

    sup.run(specs).await?;

    for group in streams.groups()? {
        tracing::info!(
            group = %group.name,
            consumers = group.consumers,
            pending = group.pending,
            last_delivered = %group.last_delivered,
            "group summary"
        );
    }
    for record in streams.pending(GROUP)? {
        tracing::info!(
            entry = %record.entry_id(),
            owner = record.owner(),
            deliveries = record.delivery_count(),
            "left pending"
        );
    }
    streams.close();
    Ok(())
}
