use async_trait::async_trait;

use antiradar_core::Coordinates;

/// Trait for address-to-coordinates backends.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-text address. `Ok(None)` means the service found no match.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} — {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}
