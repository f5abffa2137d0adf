//! The wire shape of an item.

use crate::error::CodecResult;
use crate::key::encode_key;
use crate::value::{decode_value, encode_value};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A key and its JSON document, as clients send it when adding an item.
///
/// Field names are capitalized on the wire: `{"Key": "...", "Value": ...}`.
/// Missing fields default to an empty key and a `null` value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketItem {
    /// The item key.
    #[serde(rename = "Key", default)]
    pub key: String,
    /// The item document.
    #[serde(rename = "Value", default)]
    pub value: Value,
}

impl BucketItem {
    /// Creates an item.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Rebuilds an item from a stored key and stored value bytes.
    ///
    /// # Errors
    ///
    /// Returns a decoding error if `value` is malformed.
    pub fn from_stored(key: impl Into<String>, value: &[u8]) -> CodecResult<Self> {
        Ok(Self::new(key, decode_value(value)?))
    }

    /// Returns the stored form of the key.
    #[must_use]
    pub fn encode_key(&self) -> Vec<u8> {
        encode_key(&self.key)
    }

    /// Returns the stored form of the value.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the value cannot be serialized.
    pub fn encode_value(&self) -> CodecResult<Vec<u8>> {
        encode_value(&self.value)
    }
}
