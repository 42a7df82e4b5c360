use redrive::{
    ActivityBackend, ActivityRegistry, ActivityScheduler, EventQueue, FixedDelaySimulator, HistoryCache, QueueError,
    RendezvousSignal, RuntimeOptions, SchedulingEvent,
};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::CountingBackend;

// 1) History cache: first writer wins and entries never change afterwards.
#[test]
fn history_cache_first_writer_wins() {
    let cache = HistoryCache::new();
    assert!(cache.is_empty());
    assert!(cache.lookup("A").is_none());

    assert!(cache.insert_if_absent("A", Ok("r1".into())));
    assert!(
        !cache.insert_if_absent("A", Ok("r2".into())),
        "second insert must be a no-op"
    );
    assert!(!cache.insert_if_absent("A", Err("late failure".into())));

    assert_eq!(cache.lookup("A"), Some(Ok("r1".into())));
    assert_eq!(cache.len(), 1);
}

// 2) History cache: concurrent duplicate completions leave one stable entry.
#[tokio::test]
async fn history_cache_concurrent_inserts_keep_one_entry() {
    let cache = Arc::new(HistoryCache::new());
    let mut joins = Vec::new();
    for i in 0..16 {
        let cache = cache.clone();
        joins.push(tokio::spawn(async move {
            cache.insert_if_absent("Ship", Ok(format!("writer-{i}")))
        }));
    }
    let mut wins = 0;
    for j in joins {
        if j.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1, "exactly one insert may report success");
    let recorded = cache.lookup("Ship").unwrap().unwrap();
    assert!(recorded.starts_with("writer-"));
    assert_eq!(cache.len(), 1);
}

// 3) Event queue: FIFO delivery, non-blocking enqueue rejects at capacity.
#[tokio::test]
async fn event_queue_is_fifo_and_rejects_when_full() {
    let (queue, mut events) = EventQueue::bounded(3);
    assert_eq!(queue.capacity(), 3);

    for _ in 0..3 {
        queue.enqueue(SchedulingEvent::StartExecution).await.unwrap();
    }
    assert_eq!(
        queue.try_enqueue(SchedulingEvent::StartExecution),
        Err(QueueError::Full)
    );

    assert_eq!(events.next().await, Some(SchedulingEvent::StartExecution));
    // a consumed slot makes room again
    queue.try_enqueue(SchedulingEvent::StartExecution).unwrap();
}

// 4) Event queue: blocking enqueue applies backpressure instead of dropping.
#[tokio::test]
async fn event_queue_enqueue_blocks_until_capacity() {
    let (queue, mut events) = EventQueue::bounded(1);
    queue.enqueue(SchedulingEvent::StartExecution).await.unwrap();

    let blocked = tokio::time::timeout(
        Duration::from_millis(50),
        queue.enqueue(SchedulingEvent::StartExecution),
    )
    .await;
    assert!(blocked.is_err(), "enqueue on a full queue must wait, not drop");

    let producer = tokio::spawn({
        let queue = queue.clone();
        async move { queue.enqueue(SchedulingEvent::StartExecution).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(events.next().await, Some(SchedulingEvent::StartExecution));
    producer.await.unwrap().unwrap();
    assert_eq!(events.next().await, Some(SchedulingEvent::StartExecution));
}

// 5) Event queue: close refuses new events, drains buffered ones, then ends.
#[tokio::test]
async fn event_queue_close_drains_then_ends() {
    let (queue, mut events) = EventQueue::bounded(3);
    queue.enqueue(SchedulingEvent::StartExecution).await.unwrap();
    queue.enqueue(SchedulingEvent::StartExecution).await.unwrap();

    events.close();
    assert_eq!(
        queue.try_enqueue(SchedulingEvent::StartExecution),
        Err(QueueError::Closed)
    );
    assert_eq!(
        queue.enqueue(SchedulingEvent::StartExecution).await,
        Err(QueueError::Closed)
    );

    assert_eq!(events.next().await, Some(SchedulingEvent::StartExecution));
    assert_eq!(events.next().await, Some(SchedulingEvent::StartExecution));
    assert_eq!(events.next().await, None, "closed and drained queue must end the stream");
}

// 6) Rendezvous signal: an edge raised before the wait is never lost, and
//    set is idempotent.
#[tokio::test]
async fn rendezvous_signal_keeps_pre_wait_edge() {
    let signal = RendezvousSignal::new();
    assert!(!signal.is_set());

    signal.set();
    signal.set();
    assert!(signal.is_set());

    signal.wait().await;
    signal.wait().await; // stays set until reset
}

// 7) Rendezvous signal: reset clears the slot and the primitive is reusable.
#[tokio::test]
async fn rendezvous_signal_reset_clears_the_slot() {
    let signal = Arc::new(RendezvousSignal::new());
    signal.set();
    signal.wait().await;

    signal.reset();
    assert!(!signal.is_set());
    let pending = tokio::time::timeout(Duration::from_millis(50), signal.wait()).await;
    assert!(pending.is_err(), "wait after reset must suspend until the next edge");

    let waiter = tokio::spawn({
        let signal = signal.clone();
        async move { signal.wait().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    signal.set();
    tokio::time::timeout(Duration::from_millis(500), waiter)
        .await
        .expect("set must wake the parked waiter")
        .unwrap();
}

// 8) Scheduler: one execution per identifier, and the completion event only
//    arrives after the outcome is recorded.
#[tokio::test]
async fn scheduler_dispatches_each_identifier_once() {
    let backend = Arc::new(CountingBackend::new(Duration::from_millis(30)));
    let cache = Arc::new(HistoryCache::new());
    let (queue, mut events) = EventQueue::bounded(3);
    let scheduler = ActivityScheduler::new(backend.clone(), cache.clone(), queue);

    assert!(scheduler.dispatch("Ship", Some("7".into())));
    assert!(
        !scheduler.dispatch("Ship", None),
        "in-flight identifier must not dispatch again"
    );
    assert_eq!(scheduler.in_flight_count(), 1);

    assert_eq!(events.next().await, Some(SchedulingEvent::StartExecution));
    assert_eq!(cache.lookup("Ship"), Some(Ok("Ship-Input-7-COMPLETE".into())));
    assert_eq!(backend.count("Ship"), 1);
    assert_eq!(scheduler.in_flight_count(), 0);

    assert!(
        !scheduler.dispatch("Ship", None),
        "recorded identifier must not dispatch again"
    );
    assert_eq!(backend.count("Ship"), 1);
}

// 9) Stand-in backend derives its result from name and input; an absent
//    input renders as N/A.
#[tokio::test]
async fn fixed_delay_simulator_result_format() {
    let backend = FixedDelaySimulator::new(Duration::from_millis(1));
    assert_eq!(
        backend.execute("Ship", Some("7")).await.unwrap(),
        "Ship-Input-7-COMPLETE"
    );
    assert_eq!(
        backend.execute("Ship", None).await.unwrap(),
        "Ship-Input-N/A-COMPLETE"
    );
    assert_eq!(FixedDelaySimulator::DEFAULT_DELAY, Duration::from_secs(2));
}

// 10) Registry backend: registered handlers run, unknown names fail with
//     unregistered:<name>.
#[tokio::test]
async fn activity_registry_executes_and_flags_unregistered() {
    let registry = ActivityRegistry::builder()
        .register("Upper", |input: Option<String>| async move {
            Ok(input.unwrap_or_default().to_uppercase())
        })
        .build();

    assert_eq!(registry.execute("Upper", Some("ok")).await.unwrap(), "OK");
    assert_eq!(registry.execute("Nope", None).await, Err("unregistered:Nope".into()));
    assert!(registry.get("Upper").is_some());
    assert!(registry.get("Nope").is_none());
    assert_eq!(registry.list_activity_names(), vec!["Upper".to_string()]);
}

// 11) Driver tunables default to a 3-slot queue and a 250ms teardown grace.
#[test]
fn runtime_options_defaults() {
    let options = RuntimeOptions::default();
    assert_eq!(options.queue_capacity, 3);
    assert_eq!(options.abandon_grace, Duration::from_millis(250));
}
