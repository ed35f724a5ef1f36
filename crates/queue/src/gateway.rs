//! WebSocket chat-gateway message source.
//!
//! The gateway speaks JSON text frames:
//!
//! ```text
//! ← {"type": "hello",   "user_id": "1000..."}                 first frame, session identity
//! ← {"type": "message", "author_id": "1000...", "text": "..."}
//! ```
//!
//! Any other frame type is ignored. Authentication is the cookie header
//! built from [`Credentials`]; the gateway answers 401/403 on a bad session.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use antiradar_core::config::SourceConfig;

use crate::credentials::Credentials;
use crate::error::SourceError;
use crate::source::{InboundEvent, MessageSource, Session};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GatewayFrame {
    Hello {
        user_id: String,
    },
    Message {
        author_id: String,
        #[serde(default)]
        text: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

fn parse_frame(text: &str) -> Result<GatewayFrame, serde_json::Error> {
    serde_json::from_str(text)
}

pub struct GatewaySource {
    url: String,
    handshake_timeout: Duration,
}

impl GatewaySource {
    pub fn new(url: impl Into<String>, handshake_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            handshake_timeout,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        let url = config
            .gateway_url
            .clone()
            .ok_or_else(|| SourceError::Connect("SOURCE_GATEWAY_URL not set".into()))?;
        Ok(Self::new(url, Duration::from_secs(config.handshake_timeout_secs)))
    }
}

fn map_connect_error(e: WsError) -> SourceError {
    match e {
        WsError::Http(response)
            if response.status() == StatusCode::UNAUTHORIZED
                || response.status() == StatusCode::FORBIDDEN =>
        {
            SourceError::Auth(format!("gateway rejected session: {}", response.status()))
        }
        other => SourceError::Connect(other.to_string()),
    }
}

/// Wait for the hello frame and return the session's own user id.
async fn await_hello(stream: &mut WsStream) -> Result<String, SourceError> {
    while let Some(msg) = stream.next().await {
        let msg = msg.map_err(|e| SourceError::Handshake(e.to_string()))?;
        match msg {
            WsMessage::Text(text) => match parse_frame(&text) {
                Ok(GatewayFrame::Hello { user_id }) => return Ok(user_id),
                Ok(other) => debug!(frame = ?other, "frame before hello ignored"),
                Err(e) => warn!(error = %e, "unparseable frame before hello"),
            },
            WsMessage::Close(frame) => {
                return Err(SourceError::Handshake(format!(
                    "closed during handshake: {:?}",
                    frame
                )))
            }
            _ => {}
        }
    }
    Err(SourceError::Handshake("stream ended before hello".into()))
}

#[async_trait]
impl MessageSource for GatewaySource {
    async fn start_session(&self, credentials: &Credentials) -> Result<Box<dyn Session>, SourceError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| SourceError::Connect(format!("invalid gateway url '{}': {}", self.url, e)))?;
        let cookie = HeaderValue::from_str(&credentials.cookie_header())
            .map_err(|e| SourceError::Credentials(format!("cookie not usable as header: {}", e)))?;
        request.headers_mut().insert(COOKIE, cookie);

        let (mut stream, _response) = connect_async(request).await.map_err(map_connect_error)?;

        let identity = tokio::time::timeout(self.handshake_timeout, await_hello(&mut stream))
            .await
            .map_err(|_| {
                SourceError::Handshake(format!("no hello within {:?}", self.handshake_timeout))
            })??;

        info!(url = %self.url, identity = %identity, "gateway session established");

        Ok(Box::new(GatewaySession { stream, identity }))
    }

    fn name(&self) -> &str {
        "gateway"
    }
}

struct GatewaySession {
    stream: WsStream,
    identity: String,
}

#[async_trait]
impl Session for GatewaySession {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn next_event(&mut self) -> Result<InboundEvent, SourceError> {
        loop {
            let Some(msg) = self.stream.next().await else {
                return Err(SourceError::Disconnected("stream ended".into()));
            };
            let msg = msg.map_err(|e| SourceError::Disconnected(e.to_string()))?;
            match msg {
                WsMessage::Text(text) => match parse_frame(&text) {
                    Ok(GatewayFrame::Message {
                        author_id,
                        text: Some(text),
                    }) if !text.trim().is_empty() => {
                        return Ok(InboundEvent { author_id, text });
                    }
                    Ok(GatewayFrame::Message { author_id, .. }) => {
                        debug!(author_id = %author_id, "message without text skipped");
                    }
                    Ok(other) => debug!(frame = ?other, "frame ignored"),
                    Err(e) => warn!(error = %e, "unparseable gateway frame"),
                },
                WsMessage::Close(frame) => {
                    return Err(SourceError::Disconnected(format!(
                        "closed by gateway: {:?}",
                        frame
                    )));
                }
                // Pings are answered by the transport.
                _ => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| SourceError::Disconnected(e.to_string()))
    }
}
