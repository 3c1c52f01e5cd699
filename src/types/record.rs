//! Geolocated rock records.

use serde::{Deserialize, Serialize};

/// A validated row describing a named rock occurrence at a coordinate.
///
/// Serializes with the dataset's public field names
/// (`Id`, `Place`, `Rocks`, `Latitude`, `Longitude`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    /// Record identifier, unique within one ingestion.
    #[serde(rename = "Id")]
    pub id: String,
    /// Free-text place name. May be empty.
    #[serde(rename = "Place")]
    pub place: String,
    /// Rock name. Never empty.
    #[serde(rename = "Rocks")]
    pub rocks: String,
    /// Latitude in decimal degrees. Never zero.
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    /// Longitude in decimal degrees. Never zero.
    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

impl GeoRecord {
    /// Create a record. No validation is performed; see [`GeoRecord::is_valid`].
    pub fn new(
        id: impl Into<String>,
        place: impl Into<String>,
        rocks: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id: id.into(),
            place: place.into(),
            rocks: rocks.into(),
            latitude,
            longitude,
        }
    }

    /// Whether the record satisfies the store invariant.
    ///
    /// Zero is the "no GPS fix" sentinel, so zero coordinates are rejected
    /// along with NaN and infinities.
    pub fn is_valid(&self) -> bool {
        !self.rocks.is_empty() && is_usable_coordinate(self.latitude) && is_usable_coordinate(self.longitude)
    }
}

/// A coordinate is usable when it is finite and not the zero sentinel.
pub fn is_usable_coordinate(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

/// In-place change to an existing record.
///
/// `None` fields are left untouched. The identifier can never be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    /// New place name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    /// New rock name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rocks: Option<String>,
    /// New latitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// New longitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl RecordPatch {
    /// Patch that renames the rock.
    pub fn rename(rocks: impl Into<String>) -> Self {
        Self {
            rocks: Some(rocks.into()),
            ..Self::default()
        }
    }

    /// Patch that moves the record to a new place and coordinate.
    pub fn relocate(place: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            place: Some(place.into()),
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }

    /// Apply the patch to a record. String fields are trimmed.
    pub fn apply(&self, record: &mut GeoRecord) {
        if let Some(place) = &self.place {
            record.place = place.trim().to_string();
        }
        if let Some(rocks) = &self.rocks {
            record.rocks = rocks.trim().to_string();
        }
        if let Some(latitude) = self.latitude {
            record.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            record.longitude = longitude;
        }
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.place.is_none() && self.rocks.is_none() && self.latitude.is_none() && self.longitude.is_none()
    }
}

/// Case-insensitive substring filter over rock name and place.
///
/// A field set to `Some("")` (or whitespace) matches nothing; a `None` field
/// does not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Term matched against the rock name.
    #[serde(default)]
    pub rock: Option<String>,
    /// Term matched against the place.
    #[serde(default)]
    pub place: Option<String>,
}

impl RecordFilter {
    /// Whether the filter places no constraint at all.
    pub fn is_unconstrained(&self) -> bool {
        self.rock.is_none() && self.place.is_none()
    }

    /// Check a record against the filter.
    pub fn matches(&self, record: &GeoRecord) -> bool {
        term_matches(self.rock.as_deref(), &record.rocks)
            && term_matches(self.place.as_deref(), &record.place)
    }
}

fn term_matches(term: Option<&str>, field: &str) -> bool {
    match term {
        None => true,
        Some(term) => {
            let term = term.trim().to_lowercase();
            !term.is_empty() && field.to_lowercase().contains(&term)
        }
    }
}
