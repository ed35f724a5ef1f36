use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use antiradar_core::{Coordinates, InboundMessage};
use antiradar_queue::ingestion_queue;
use antiradar_storage::MemoryRecordStore;

use crate::helpers::{consumer, within, wait_until, FakeGeocoder, Reply, ScriptedProvider, DEFAULT_TOWN};

const ZJEDNOCZENIA: &str = "Spotkajmy się na ulicy Zjednoczenia.";

/// Enqueue `messages`, close the queue and run the consumer until drained.
async fn drain(
    provider: ScriptedProvider,
    geocoder: FakeGeocoder,
    store: Arc<MemoryRecordStore>,
    messages: &[&str],
) {
    let (tx, rx) = ingestion_queue();
    for text in messages {
        tx.enqueue(InboundMessage::new(*text)).unwrap();
    }
    drop(tx);
    within(consumer(rx, provider, geocoder, store).run(CancellationToken::new())).await;
}

#[tokio::test]
async fn empty_town_defaults_to_region_town() {
    let provider = ScriptedProvider::default().reply(ZJEDNOCZENIA, r#"{"town": "", "street": "Zjednoczenia"}"#);
    let geocoder = FakeGeocoder::default().place("Zjednoczenia", 51.94, 15.50);
    let store = Arc::new(MemoryRecordStore::new());

    drain(provider, geocoder, store.clone(), &[ZJEDNOCZENIA]).await;

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].town, DEFAULT_TOWN);
    assert_eq!(records[0].street, "Zjednoczenia");
    assert_eq!(records[0].message, ZJEDNOCZENIA);
    assert_eq!(records[0].coordinates(), Some(Coordinates::new(51.94, 15.50)));
}

#[tokio::test]
async fn malformed_extraction_produces_no_record_and_loop_continues() {
    let provider = ScriptedProvider::default()
        .reply("Idziemy na rynek?", "Sorry, I can't help with that.")
        .reply("Ochla stoją", r#"{"town": "Ochla"}"#);
    let store = Arc::new(MemoryRecordStore::new());

    drain(
        provider,
        FakeGeocoder::default(),
        store.clone(),
        &["Idziemy na rynek?", "Ochla stoją"],
    )
    .await;

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].town, "Ochla");
}

#[tokio::test]
async fn empty_object_and_service_failure_produce_no_record() {
    let provider = ScriptedProvider::default()
        .reply("dzień dobry", "{}")
        .on("Łężyca", Reply::Fail);
    let calls = provider.calls();
    let store = Arc::new(MemoryRecordStore::new());

    drain(provider, FakeGeocoder::default(), store.clone(), &["dzień dobry", "Łężyca"]).await;

    assert!(store.records().is_empty());
    // One call per message, none retried.
    assert_eq!(*calls.lock().unwrap(), vec!["dzień dobry", "Łężyca"]);
}

#[tokio::test]
async fn unresolvable_address_is_stored_without_coordinates() {
    let provider = ScriptedProvider::default().reply("Atlantis", r#"{"town": "Atlantis", "street": ""}"#);
    let geocoder = FakeGeocoder::default();
    let queries = geocoder.queries();
    let store = Arc::new(MemoryRecordStore::new());

    drain(provider, geocoder, store.clone(), &["Atlantis"]).await;

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].town, "Atlantis");
    assert_eq!(records[0].street, "");
    assert_eq!(records[0].latitude, None);
    assert_eq!(records[0].longitude, None);
    assert_eq!(*queries.lock().unwrap(), vec!["Atlantis"]);
}

#[tokio::test]
async fn geocoder_error_degrades_to_no_coordinates() {
    let provider = ScriptedProvider::default().reply("error street", r#"{"town": "Ochla", "street": "error"}"#);
    let geocoder = FakeGeocoder::default();
    let queries = geocoder.queries();
    let store = Arc::new(MemoryRecordStore::new());

    drain(provider, geocoder, store.clone(), &["error street"]).await;

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].coordinates(), None);
    assert_eq!(*queries.lock().unwrap(), vec!["error, Ochla, Lubuskie, Poland"]);
}

#[tokio::test]
async fn store_failure_is_skipped_without_retry() {
    let provider = ScriptedProvider::default()
        .reply("pierwsza", r#"{"town": "Ochla"}"#)
        .reply("druga", r#"{"town": "Wilkanowo"}"#);
    let calls = provider.calls();
    let store = Arc::new(MemoryRecordStore::new());
    store.fail_next(1);

    drain(provider, FakeGeocoder::default(), store.clone(), &["pierwsza", "druga"]).await;

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].town, "Wilkanowo");
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn records_are_persisted_in_arrival_order() {
    let provider = ScriptedProvider::default()
        .reply("m1", r#"{"town": "Ochla"}"#)
        .reply("m2", r#"{"town": "Wilkanowo"}"#)
        .reply("m3", r#"{"town": "Łężyca"}"#);
    let store = Arc::new(MemoryRecordStore::new());

    drain(provider, FakeGeocoder::default(), store.clone(), &["m1", "m2", "m3"]).await;

    let records = store.records();
    let towns: Vec<_> = records.iter().map(|r| r.town.as_str()).collect();
    assert_eq!(towns, vec!["Ochla", "Wilkanowo", "Łężyca"]);
    assert!(records.windows(2).all(|w| w[0].id < w[1].id && w[0].post_time < w[1].post_time));
}

#[tokio::test]
async fn coordinates_are_always_paired() {
    let provider = ScriptedProvider::default()
        .reply("a", r#"{"town": "Ochla"}"#)
        .reply("b", r#"{"town": "Atlantis"}"#);
    let geocoder = FakeGeocoder::default().place("Ochla", 51.89, 15.43);
    let store = Arc::new(MemoryRecordStore::new());

    drain(provider, geocoder, store.clone(), &["a", "b"]).await;

    let records = store.records();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.latitude.is_some(), record.longitude.is_some());
    }
    assert!(records[0].coordinates().is_some());
    assert!(records[1].coordinates().is_none());
}

#[tokio::test]
async fn cancellation_drops_in_flight_message() {
    let provider = ScriptedProvider::default().on("wisi", Reply::Hang);
    let calls = provider.calls();
    let store = Arc::new(MemoryRecordStore::new());
    let (tx, rx) = ingestion_queue();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(consumer(rx, provider, FakeGeocoder::default(), store.clone()).run(cancel.clone()));

    tx.enqueue(InboundMessage::new("wisi")).unwrap();
    wait_until(|| calls.lock().unwrap().len() == 1).await;

    cancel.cancel();
    within(handle).await.unwrap();
    assert!(store.records().is_empty());
}
