pub mod adapter;
pub mod geocoder;
pub mod nominatim;

pub use adapter::{compose_address, GeocoderAdapter};
pub use geocoder::{GeocodeError, Geocoder};
pub use nominatim::NominatimGeocoder;
