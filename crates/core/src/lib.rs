pub mod config;
pub mod error;
pub mod location;

pub use config::Config;
pub use error::*;
pub use location::*;
