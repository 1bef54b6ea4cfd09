use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use taskstream::{
    BackoffPolicy, Block, Config, ConsumerOptions, ConsumerWorker, Entry, EntryId, Event,
    EventKind, Fields, HandlerFn, JitterPolicy, MemoryLog, Outcome, ProducerWorker,
    RestartPolicy, Streams, Supervisor, WorkerError, WorkerRef, WorkerSpec,
};

const GROUP: &str = "consumer-group-1";

fn config() -> Config {
    Config {
        grace: Duration::from_secs(5),
        backoff: BackoffPolicy {
            first: Duration::from_millis(10),
            max: Duration::from_millis(100),
            factor: 2.0,
            jitter: JitterPolicy::None,
        },
        ..Config::default()
    }
}

fn batch(n: u32) -> Vec<Fields> {
    (0..n)
        .map(|i| Fields::from([("worker_id", (2000 + i).to_string())]))
        .collect()
}

fn drain_kinds(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

/// Records acked ids; the first attempt at `worker_id=2003` fails.
fn flaky_handler(
    processed: Arc<Mutex<Vec<EntryId>>>,
) -> HandlerFn<impl Fn(Entry) -> futures::future::Ready<Result<Outcome, WorkerError>>> {
    let crashed = Arc::new(AtomicBool::new(false));
    HandlerFn::new(move |e: Entry| {
        let res = if e.get("worker_id") == Some("2003") && !crashed.swap(true, Ordering::SeqCst) {
            Err(WorkerError::fail("consumer crashed mid-entry"))
        } else {
            processed.lock().push(e.id());
            Ok(Outcome::Ack)
        };
        futures::future::ready(res)
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn crashed_consumer_recovers_its_entries_after_restart() {
    let cfg = config();
    let sup = Supervisor::new(cfg.clone(), Vec::new());
    let mut rx = sup.bus().subscribe();
    let log = Arc::new(MemoryLog::new());
    let streams = Arc::new(Streams::open_with_bus(log, sup.bus().clone()));
    streams
        .create_group(GROUP, taskstream::StartId::BEGINNING)
        .await
        .unwrap();

    let producer = ProducerWorker::new("producer", Arc::clone(&streams), batch(10)).arc();
    let processed = Arc::new(Mutex::new(Vec::new()));
    let handler = flaky_handler(Arc::clone(&processed));

    let opts = ConsumerOptions::new(GROUP, "consumer-1").with_block(Block::millis(200));
    let consumer: WorkerRef = ConsumerWorker::arc(Arc::clone(&streams), opts, handler);

    let specs = vec![
        WorkerSpec::with_defaults(producer.clone(), &cfg),
        WorkerSpec::with_defaults(consumer, &cfg),
    ];
    sup.run(specs).await.unwrap();

    assert_eq!(producer.appended(), 10);
    let processed = processed.lock().clone();
    let unique: HashSet<_> = processed.iter().copied().collect();
    assert_eq!(processed.len(), 10);
    assert_eq!(unique.len(), 10);

    let stats = streams.stats(GROUP).unwrap();
    assert_eq!(stats.pending, 0);

    let events = drain_kinds(&mut rx);
    assert!(events.iter().any(|e| e.kind == EventKind::EntriesRedelivered
        && e.consumer.as_deref() == Some("consumer-1")));
    let starts = events
        .iter()
        .filter(|e| {
            e.kind == EventKind::WorkerStarting && e.worker.as_deref() == Some("consumer-1")
        })
        .count();
    assert_eq!(starts, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_consumers_share_the_work_exactly_once() {
    let cfg = config();
    let sup = Supervisor::new(cfg.clone(), Vec::new());
    let streams = Arc::new(Streams::open_with_bus(
        Arc::new(MemoryLog::new()),
        sup.bus().clone(),
    ));
    streams
        .create_group(GROUP, taskstream::StartId::BEGINNING)
        .await
        .unwrap();

    let producer = ProducerWorker::new("producer", Arc::clone(&streams), batch(60))
        .with_interval(Duration::from_millis(1))
        .arc();
    let mut specs = vec![WorkerSpec::with_defaults(producer, &cfg)];

    let processed = Arc::new(Mutex::new(Vec::new()));
    for c in 1..=3 {
        let processed = Arc::clone(&processed);
        let handler = HandlerFn::new(move |e: Entry| {
            let processed = Arc::clone(&processed);
            async move {
                processed.lock().push((c, e.id()));
                Ok::<_, WorkerError>(Outcome::Ack)
            }
        });
        let opts = ConsumerOptions::new(GROUP, format!("consumer-{c}"))
            .with_count(2)
            .with_block(Block::millis(300));
        let consumer: WorkerRef = ConsumerWorker::arc(Arc::clone(&streams), opts, handler);
        specs.push(WorkerSpec::with_defaults(consumer, &cfg));
    }

    sup.run(specs).await.unwrap();

    let processed = processed.lock().clone();
    let ids: HashSet<_> = processed.iter().map(|(_, id)| *id).collect();
    assert_eq!(processed.len(), 60);
    assert_eq!(ids.len(), 60);
    for c in 1..=3 {
        let mine: Vec<_> = processed
            .iter()
            .filter(|(owner, _)| *owner == c)
            .map(|(_, id)| *id)
            .collect();
        assert!(mine.windows(2).all(|w| w[0] < w[1]));
    }
    assert_eq!(streams.stats(GROUP).unwrap().pending, 0);
}

#[tokio::test]
async fn long_running_consumer_stops_on_shutdown() {
    let cfg = config();
    let sup = Supervisor::new(cfg.clone(), Vec::new());
    let mut rx = sup.bus().subscribe();
    let streams = Arc::new(Streams::open_with_bus(
        Arc::new(MemoryLog::new()),
        sup.bus().clone(),
    ));

    let opts = ConsumerOptions::new(GROUP, "consumer-1")
        .with_block(Block::Forever)
        .with_drain(false);
    let consumer: WorkerRef = ConsumerWorker::arc(
        Arc::clone(&streams),
        opts,
        HandlerFn::new(|_e: Entry| async { Ok::<_, WorkerError>(Outcome::Ack) }),
    );
    let spec = WorkerSpec::with_defaults(consumer, &cfg).with_restart(RestartPolicy::Always {
        interval: None,
    });

    let stop = CancellationToken::new();
    let trigger = {
        let streams = Arc::clone(&streams);
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let mut last = EntryId::ZERO;
            for fields in batch(3) {
                last = streams.append(fields).await.unwrap();
            }
            loop {
                if let Ok(stats) = streams.stats(GROUP) {
                    if stats.last_delivered == last && stats.pending == 0 {
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            stop.cancel();
        })
    };

    sup.run_until(vec![spec], stop).await.unwrap();
    trigger.await.unwrap();

    let kinds: Vec<_> = drain_kinds(&mut rx).into_iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::ShutdownRequested));
    assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
    assert_eq!(streams.stats(GROUP).unwrap().pending, 0);
}
