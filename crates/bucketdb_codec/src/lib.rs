//! # BucketDB Codec
//!
//! Conversion between the opaque bytes the engine stores and the JSON
//! documents clients exchange.
//!
//! - Values are stored as JSON text. Any `Serialize` type can be encoded;
//!   stored bytes decode to a [`serde_json::Value`] or any `DeserializeOwned`
//!   type.
//! - An empty byte sequence decodes to `null`. The engine hands back empty
//!   bytes for a key it does not hold, and encoded JSON is never empty, so
//!   callers can tell the two apart by checking for emptiness first.
//! - Keys are strings stored as their UTF-8 bytes.
//!
//! ## Usage
//!
//! ```
//! use bucketdb_codec::{decode_value, encode_value};
//! use serde_json::json;
//!
//! let doc = json!({"name": "apple", "price": 2.5, "isRipe": true});
//! let bytes = encode_value(&doc).unwrap();
//! assert_eq!(decode_value(&bytes).unwrap(), doc);
//! assert!(decode_value(&[]).unwrap().is_null());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod item;
mod key;
mod value;

pub use error::{CodecError, CodecResult};
pub use item::BucketItem;
pub use key::{decode_key, encode_key};
pub use value::{decode_value, decode_value_as, encode_value};

/// Re-exported document type.
pub use serde_json::Value;
