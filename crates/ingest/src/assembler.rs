use antiradar_core::{ExtractedLocation, GeocodeOutcome, NewLocationRecord};

/// Combines an extraction and its geocode outcome into a storable record.
///
/// Pure: the same inputs always give the same town, street and coordinates.
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    default_town: String,
}

impl RecordAssembler {
    pub fn new(default_town: impl Into<String>) -> Self {
        Self {
            default_town: default_town.into(),
        }
    }

    /// A `NoMatch` outcome still yields a record, with both coordinates unset.
    pub fn assemble(
        &self,
        message: &str,
        location: &ExtractedLocation,
        outcome: GeocodeOutcome,
    ) -> NewLocationRecord {
        let town = location.town.trim();
        let town = if town.is_empty() {
            self.default_town.clone()
        } else {
            town.to_string()
        };

        NewLocationRecord {
            town,
            street: location.street.trim().to_string(),
            coordinates: outcome.coordinates(),
            message: message.to_string(),
        }
    }
}
