//! Record shapes exchanged with the record store.
//!
//! Field names follow the store's JSON (`collectionId`, `created`, ...), so
//! records are passed through to API clients unchanged.

use serde::{Deserialize, Deserializer, Serialize};

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A stored, geotagged audio clip.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AudioRecord {
    pub id: String,
    #[serde(rename = "collectionId", default)]
    pub collection_id: String,
    #[serde(
        rename = "collectionName",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub collection_name: String,
    /// Stored filename of the audio payload.
    #[serde(default, deserialize_with = "null_as_default")]
    pub audio: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub loudness: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

/// Everything the store needs to create a record from an upload.
#[derive(Clone, Debug)]
pub struct NewAudioRecord {
    /// Original filename as sent by the client.
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    pub latitude: f64,
    pub longitude: f64,
    pub loudness: f64,
    pub tags: Vec<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AudioRecordUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loudness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl AudioRecordUpdate {
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.loudness.is_none()
            && self.tags.is_none()
    }

    pub fn apply_to(&self, record: &mut AudioRecord) {
        if let Some(latitude) = self.latitude {
            record.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            record.longitude = longitude;
        }
        if let Some(loudness) = self.loudness {
            record.loudness = loudness;
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
    }
}

/// Splits a comma-separated tag list, trimming entries and dropping empty ones.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
