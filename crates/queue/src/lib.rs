pub mod channel;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod listener;
pub mod source;

pub use channel::{ingestion_queue, QueueReceiver, QueueSender};
pub use credentials::Credentials;
pub use error::{QueueError, SourceError};
pub use gateway::GatewaySource;
pub use listener::{Listener, ListenerError};
pub use source::{InboundEvent, MessageSource, Session};
