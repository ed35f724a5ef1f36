//! Turns an extracted (town, street) pair into a geocode outcome.
//!
//! One lookup per extraction, no retries, no ranking beyond the service's
//! own ordering. Service errors become [`GeocodeOutcome::NoMatch`].

use std::sync::Arc;

use tracing::{info, warn};

use antiradar_core::{ExtractedLocation, GeocodeOutcome};

use crate::geocoder::Geocoder;

pub struct GeocoderAdapter {
    geocoder: Arc<dyn Geocoder>,
    /// Fallback region appended when both town and street are known.
    region: String,
}

impl GeocoderAdapter {
    pub fn new(geocoder: Arc<dyn Geocoder>, region: impl Into<String>) -> Self {
        Self {
            geocoder,
            region: region.into(),
        }
    }

    pub async fn resolve(&self, location: &ExtractedLocation) -> GeocodeOutcome {
        let Some(address) = compose_address(&location.town, &location.street, &self.region) else {
            info!("nothing to geocode — empty town and street");
            return GeocodeOutcome::NoMatch;
        };

        match self.geocoder.geocode(&address).await {
            Ok(Some(coordinates)) => {
                info!(
                    address = %address,
                    lat = coordinates.latitude,
                    lon = coordinates.longitude,
                    "address geocoded"
                );
                GeocodeOutcome::Match(coordinates)
            }
            Ok(None) => {
                info!(address = %address, "no geocode match");
                GeocodeOutcome::NoMatch
            }
            Err(e) => {
                warn!(address = %address, error = %e, "geocoding failed — treating as no match");
                GeocodeOutcome::NoMatch
            }
        }
    }
}

/// Build the single lookup string for a town/street pair.
///
/// Both present: `"{street}, {town}, {region}"`. One present: that one.
/// Neither: `None`, and no lookup is made.
pub fn compose_address(town: &str, street: &str, region: &str) -> Option<String> {
    let town = town.trim();
    let street = street.trim();
    let region = region.trim();
    match (town.is_empty(), street.is_empty()) {
        (false, false) if region.is_empty() => Some(format!("{street}, {town}")),
        (false, false) => Some(format!("{street}, {town}, {region}")),
        (false, true) => Some(town.to_string()),
        (true, false) => Some(street.to_string()),
        (true, true) => None,
    }
}
