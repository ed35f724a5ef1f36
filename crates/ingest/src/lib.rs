//! The geotag ingestion pipeline: record assembly, the consumer loop and the
//! supervisor that runs it next to the listener.

pub mod assembler;
pub mod consumer;
pub mod error;
pub mod supervisor;

pub use assembler::RecordAssembler;
pub use consumer::Consumer;
pub use error::{PipelineError, TaskFailure, TaskKind};
pub use supervisor::{spawn_signal_handlers, Supervisor};
