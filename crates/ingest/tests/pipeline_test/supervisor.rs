use std::sync::Arc;

use antiradar_ingest::{PipelineError, Supervisor, TaskFailure, TaskKind};
use antiradar_queue::{ingestion_queue, Listener, ListenerError, SourceError};
use antiradar_storage::MemoryRecordStore;

use crate::helpers::{
    consumer, credentials, scripted_source, wait_until, within, FakeGeocoder, Reply,
    ScriptedProvider, ScriptedSource, SELF_ID,
};

fn supervisor(
    source: Arc<ScriptedSource>,
    provider: ScriptedProvider,
    store: Arc<MemoryRecordStore>,
) -> Supervisor {
    let (tx, rx) = ingestion_queue();
    let listener = Listener::new(source, credentials(), tx);
    let consumer = consumer(rx, provider, FakeGeocoder::default(), store);
    Supervisor::new(listener, consumer)
}

#[tokio::test]
async fn own_messages_never_become_records() {
    let (source, script) = scripted_source();
    let provider = ScriptedProvider::default()
        .reply("Ochla stoją", r#"{"town": "Ochla"}"#)
        .reply("Zjednoczenia czysto", r#"{"street": "Zjednoczenia"}"#);
    let calls = provider.calls();
    let store = Arc::new(MemoryRecordStore::new());

    let supervisor = supervisor(source, provider, store.clone());
    let cancel = supervisor.cancellation_token();
    let handle = tokio::spawn(supervisor.run());

    script.say(SELF_ID, "Zjednoczenia czysto");
    script.say("7", "Ochla stoją");
    wait_until(|| store.records().len() == 1).await;

    cancel.cancel();
    within(handle).await.unwrap().unwrap();

    assert_eq!(*calls.lock().unwrap(), vec!["Ochla stoją"]);
    assert_eq!(store.records()[0].town, "Ochla");
}

#[tokio::test]
async fn external_shutdown_stops_both_tasks_and_closes_session() {
    let (source, script) = scripted_source();
    let store = Arc::new(MemoryRecordStore::new());
    let provider = ScriptedProvider::default().reply("Łężyca", r#"{"town": "Łężyca"}"#);

    let supervisor = supervisor(source, provider, store.clone());
    let cancel = supervisor.cancellation_token();
    let handle = tokio::spawn(supervisor.run());

    script.say("7", "Łężyca");
    wait_until(|| store.records().len() == 1).await;

    cancel.cancel();
    let result = within(handle).await.unwrap();

    assert!(result.is_ok());
    assert!(script.is_closed());
}

#[tokio::test]
async fn auth_failure_is_fatal_and_stops_consumer() {
    let store = Arc::new(MemoryRecordStore::new());
    let supervisor = supervisor(ScriptedSource::rejecting(), ScriptedProvider::default(), store);

    let err = within(supervisor.run()).await.unwrap_err();

    assert_eq!(err.task(), TaskKind::Listener);
    assert!(matches!(
        err,
        PipelineError::Fatal {
            source: TaskFailure::Listener(ListenerError::Source(SourceError::Auth(_))),
            ..
        }
    ));
}

#[tokio::test]
async fn session_drop_is_fatal() {
    let (source, script) = scripted_source();
    let store = Arc::new(MemoryRecordStore::new());
    let supervisor = supervisor(source, ScriptedProvider::default(), store);
    let cancel = supervisor.cancellation_token();
    let handle = tokio::spawn(supervisor.run());

    script.say("7", "cześć");
    let closed = script.closed.clone();
    drop(script.events);

    let err = within(handle).await.unwrap().unwrap_err();

    assert!(err.to_string().starts_with("listener task failed"));
    assert!(matches!(
        err,
        PipelineError::Fatal {
            task: TaskKind::Listener,
            source: TaskFailure::Listener(ListenerError::Source(SourceError::Disconnected(_))),
        }
    ));
    assert!(cancel.is_cancelled());
    assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn consumer_panic_is_reported_and_closes_session() {
    let (source, script) = scripted_source();
    let store = Arc::new(MemoryRecordStore::new());
    let provider = ScriptedProvider::default().on("bum", Reply::Panic);
    let supervisor = supervisor(source, provider, store);
    let handle = tokio::spawn(supervisor.run());

    script.say("7", "bum");
    let err = within(handle).await.unwrap().unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Fatal {
            task: TaskKind::Consumer,
            source: TaskFailure::Panicked(_),
        }
    ));
    assert!(script.is_closed());
}
