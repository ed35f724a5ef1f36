//! Message source boundary: a long-lived authenticated session yielding
//! `(author, text)` events.

use async_trait::async_trait;

use crate::credentials::Credentials;
use crate::error::SourceError;

/// One inbound chat event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub author_id: String,
    pub text: String,
}

/// Opens sessions against a message source.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Authenticate and open a session. Bad credentials → [`SourceError::Auth`].
    async fn start_session(&self, credentials: &Credentials) -> Result<Box<dyn Session>, SourceError>;

    /// Short source label for logs.
    fn name(&self) -> &str;
}

/// An open session. The event sequence is infinite; it ends only with an
/// error, after which a fresh session is required.
#[async_trait]
pub trait Session: Send {
    /// The account this session is logged in as.
    fn identity(&self) -> &str;

    /// Wait for the next event. Must be cancel-safe: dropping the future
    /// before it resolves loses no event and leaves the session usable.
    async fn next_event(&mut self) -> Result<InboundEvent, SourceError>;

    /// Release the session.
    async fn close(&mut self) -> Result<(), SourceError>;
}
