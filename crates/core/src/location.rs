use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters of a message quoted in log lines.
const EXCERPT_CHARS: usize = 80;

/// A raw text message accepted by the listener.
///
/// Lives only inside the ingestion queue, between enqueue and dequeue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
        }
    }

    /// Shortened text for log lines.
    pub fn excerpt(&self) -> String {
        excerpt(&self.text)
    }
}

/// Truncate `text` to a log-friendly length on a char boundary.
pub fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Town/street guess produced by the text-understanding step.
///
/// Either field may be empty; an empty-but-valid location is still an
/// extraction and is distinct from [`Extraction::NoExtraction`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedLocation {
    pub town: String,
    pub street: String,
}

impl ExtractedLocation {
    pub fn new(town: impl Into<String>, street: impl Into<String>) -> Self {
        Self {
            town: town.into(),
            street: street.into(),
        }
    }
}

/// Outcome of extracting a location from one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Extracted(ExtractedLocation),
    NoExtraction,
}

impl Extraction {
    pub fn location(&self) -> Option<&ExtractedLocation> {
        match self {
            Extraction::Extracted(location) => Some(location),
            Extraction::NoExtraction => None,
        }
    }
}

/// A resolved WGS84 point. Latitude and longitude only travel together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Result of resolving an address.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeocodeOutcome {
    Match(Coordinates),
    NoMatch,
}

impl GeocodeOutcome {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            GeocodeOutcome::Match(c) => Some(*c),
            GeocodeOutcome::NoMatch => None,
        }
    }
}

/// An assembled record, ready to be appended to the store.
///
/// `id` and `post_time` do not exist yet; the store assigns both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLocationRecord {
    pub town: String,
    pub street: String,
    pub coordinates: Option<Coordinates>,
    pub message: String,
}

impl NewLocationRecord {
    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }
}

/// Store-assigned identity of an appended record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    pub post_time: DateTime<Utc>,
}

/// A persisted record as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: i64,
    pub town: String,
    pub street: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub message: String,
    pub post_time: DateTime<Utc>,
}

impl LocationRecord {
    pub fn from_parts(stored: StoredRecord, record: &NewLocationRecord) -> Self {
        Self {
            id: stored.id,
            town: record.town.clone(),
            street: record.street.clone(),
            latitude: record.latitude(),
            longitude: record.longitude(),
            message: record.message.clone(),
            post_time: stored.post_time,
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }
}
