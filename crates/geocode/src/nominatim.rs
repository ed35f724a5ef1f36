//! OpenStreetMap Nominatim backend.
//!
//! Nominatim's usage policy requires an identifying `User-Agent`; requests
//! without one are rejected.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use antiradar_core::config::GeocoderConfig;
use antiradar_core::Coordinates;

use crate::geocoder::{GeocodeError, Geocoder};

pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// Fails when the client cannot be built, e.g. for a `user_agent` that
    /// is not a valid header value.
    pub fn new(base_url: String, user_agent: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        Self::new(
            config.nominatim_url.clone(),
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

/// One search hit. Nominatim serialises coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Coordinates of the best (first) hit, if any.
fn first_coordinates(places: &[Place]) -> Result<Option<Coordinates>, GeocodeError> {
    let Some(place) = places.first() else {
        return Ok(None);
    };
    let latitude: f64 = place
        .lat
        .parse()
        .map_err(|_| GeocodeError::Parse(format!("bad latitude '{}'", place.lat)))?;
    let longitude: f64 = place
        .lon
        .parse()
        .map_err(|_| GeocodeError::Parse(format!("bad longitude '{}'", place.lon)))?;
    Ok(Some(Coordinates::new(latitude, longitude)))
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let url = format!("{}/search", self.base_url);

        debug!(address = %address, "Nominatim search");

        let response = self
            .client
            .get(&url)
            .query(&[("q", address), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api { status, body });
        }

        let places: Vec<Place> = response.json().await?;
        if let Some(name) = places.first().and_then(|p| p.display_name.as_deref()) {
            debug!(address = %address, matched = %name, "Nominatim hit");
        }
        first_coordinates(&places)
    }
}
