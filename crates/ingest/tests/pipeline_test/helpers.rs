use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use antiradar_core::Coordinates;
use antiradar_geocode::{GeocodeError, Geocoder, GeocoderAdapter};
use antiradar_ingest::{Consumer, RecordAssembler};
use antiradar_llm::{Extractor, LlmError, LlmProvider, Message};
use antiradar_queue::credentials::Cookie;
use antiradar_queue::{
    Credentials, InboundEvent, MessageSource, QueueReceiver, Session, SourceError,
};
use antiradar_storage::{MemoryRecordStore, PersistenceSink, RecordStore};

pub const SELF_ID: &str = "1000";
pub const DEFAULT_TOWN: &str = "Zielona Góra";
pub const REGION: &str = "Lubuskie, Poland";

// ── LLM provider ────────────────────────────────────────────────────

#[derive(Clone)]
pub enum Reply {
    Text(String),
    Fail,
    Hang,
    Panic,
}

/// Replies per user message; unknown messages get `{}`.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: HashMap<String, Reply>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn reply(mut self, message: &str, reply: &str) -> Self {
        self.replies
            .insert(message.to_string(), Reply::Text(reply.to_string()));
        self
    }

    pub fn on(mut self, message: &str, reply: Reply) -> Self {
        self.replies.insert(message.to_string(), reply);
        self
    }

    /// Every user message the provider has been asked about, in call order.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        let text = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.calls.lock().unwrap().push(text.clone());

        match self.replies.get(&text).cloned() {
            None => Ok("{}".into()),
            Some(Reply::Text(reply)) => Ok(reply),
            Some(Reply::Fail) => Err(LlmError::ApiError {
                status: 503,
                body: "upstream unavailable".into(),
            }),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Panic) => panic!("provider blew up on {text}"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ── Geocoder ────────────────────────────────────────────────────────

/// Known addresses resolve; `"error"` anywhere in an address is a service error.
#[derive(Default)]
pub struct FakeGeocoder {
    places: HashMap<String, Coordinates>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl FakeGeocoder {
    pub fn place(mut self, address: &str, lat: f64, lon: f64) -> Self {
        self.places
            .insert(address.to_string(), Coordinates::new(lat, lon));
        self
    }

    pub fn queries(&self) -> Arc<Mutex<Vec<String>>> {
        self.queries.clone()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        self.queries.lock().unwrap().push(address.to_string());
        if address.contains("error") {
            return Err(GeocodeError::Api {
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(self.places.get(address).copied())
    }
}

pub fn consumer(
    queue: QueueReceiver,
    provider: ScriptedProvider,
    geocoder: FakeGeocoder,
    store: Arc<MemoryRecordStore>,
) -> Consumer {
    let extractor = Extractor::new(Box::new(provider), "extract locations".into(), 0.1, 256);
    let adapter = GeocoderAdapter::new(Arc::new(geocoder), REGION);
    let store: Arc<dyn RecordStore> = store;
    Consumer::new(
        queue,
        extractor,
        adapter,
        RecordAssembler::new(DEFAULT_TOWN),
        PersistenceSink::new(store),
    )
}

// ── Message source ──────────────────────────────────────────────────

pub struct ScriptedSession {
    events: mpsc::UnboundedReceiver<InboundEvent>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Session for ScriptedSession {
    fn identity(&self) -> &str {
        SELF_ID
    }

    async fn next_event(&mut self) -> Result<InboundEvent, SourceError> {
        self.events
            .recv()
            .await
            .ok_or_else(|| SourceError::Disconnected("gateway went away".into()))
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// One scripted session; an empty source rejects the credentials.
pub struct ScriptedSource {
    session: Mutex<Option<ScriptedSession>>,
}

impl ScriptedSource {
    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(None),
        })
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn start_session(&self, _credentials: &Credentials) -> Result<Box<dyn Session>, SourceError> {
        match self.session.lock().unwrap().take() {
            Some(session) => Ok(Box::new(session)),
            None => Err(SourceError::Auth("session cookie expired".into())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Handle for driving a [`ScriptedSource`] from a test.
pub struct SourceScript {
    pub events: mpsc::UnboundedSender<InboundEvent>,
    pub closed: Arc<AtomicBool>,
}

impl SourceScript {
    pub fn say(&self, author: &str, text: &str) {
        self.events
            .send(InboundEvent {
                author_id: author.into(),
                text: text.into(),
            })
            .unwrap();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub fn scripted_source() -> (Arc<ScriptedSource>, SourceScript) {
    let (tx, rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    let source = Arc::new(ScriptedSource {
        session: Mutex::new(Some(ScriptedSession {
            events: rx,
            closed: closed.clone(),
        })),
    });
    (source, SourceScript { events: tx, closed })
}

pub fn credentials() -> Credentials {
    Credentials::new(vec![Cookie {
        name: "sessionid".into(),
        value: "abc".into(),
    }])
}

// ── Misc ────────────────────────────────────────────────────────────

/// Yield until `condition` holds, failing the test after a few seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let wait = async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("condition not reached in time");
}

/// Fail the test instead of hanging if `fut` never completes.
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("future did not complete in time")
}
