pub mod error;
pub mod memory;
pub mod postgres;
pub mod sink;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;
pub use sink::PersistenceSink;
pub use store::RecordStore;
