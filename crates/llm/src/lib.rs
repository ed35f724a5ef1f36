pub mod extract;
pub mod provider;
pub mod providers;

pub use extract::{parse_extraction, ExtractionRejected, Extractor};
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
