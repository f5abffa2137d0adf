//! Value encoding.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Serializes a document to its stored byte form (compact JSON text).
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if the document cannot be expressed
/// as JSON, for example a map whose keys are not strings.
pub fn encode_value<T: Serialize + ?Sized>(document: &T) -> CodecResult<Vec<u8>> {
    serde_json::to_vec(document).map_err(|e| CodecError::encoding(e.to_string()))
}

/// Decodes stored bytes into a JSON document.
///
/// Empty input decodes to [`Value::Null`].
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] on malformed input.
pub fn decode_value(bytes: &[u8]) -> CodecResult<Value> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| CodecError::decoding(e.to_string()))
}

/// Decodes stored bytes into a typed document.
///
/// Empty input is treated as `null`, so it succeeds for `Option<T>` and
/// fails for types that cannot be built from `null`.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] on malformed input or a shape
/// mismatch.
pub fn decode_value_as<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    let input: &[u8] = if bytes.is_empty() { b"null" } else { bytes };
    serde_json::from_slice(input).map_err(|e| CodecError::decoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Fruit {
        name: String,
        price: f64,
        #[serde(rename = "isRipe")]
        is_ripe: bool,
    }

    #[test]
    fn encoded_values_are_never_empty() {
        for doc in [json!(null), json!(""), json!([]), json!({})] {
            assert!(!encode_value(&doc).unwrap().is_empty());
        }
    }

    #[test]
    fn empty_bytes_decode_to_null() {
        assert_eq!(decode_value(&[]).unwrap(), Value::Null);
        assert_eq!(decode_value_as::<Option<Fruit>>(&[]).unwrap(), None);
        assert!(decode_value_as::<Fruit>(&[]).is_err());
    }

    #[test]
    fn typed_documents_decode_as_json() {
        let fruit = Fruit {
            name: "apple".into(),
            price: 2.5,
            is_ripe: true,
        };
        let bytes = encode_value(&fruit).unwrap();

        assert_eq!(
            decode_value(&bytes).unwrap(),
            json!({"name": "apple", "price": 2.5, "isRipe": true})
        );
        assert_eq!(decode_value_as::<Fruit>(&bytes).unwrap(), fruit);
    }

    #[test]
    fn non_string_map_keys_fail_to_encode() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "pair");
        let err = encode_value(&map).unwrap_err();
        assert!(matches!(err, CodecError::EncodingFailed { .. }));
    }

    #[test]
    fn malformed_input_fails_to_decode() {
        let err = decode_value(b"{\"name\":").unwrap_err();
        assert!(matches!(err, CodecError::DecodingFailed { .. }));
        assert!(decode_value(b"not json").is_err());
    }

    fn finite_f64() -> impl Strategy<Value = f64> {
        any::<f64>().prop_filter("finite", |f| f.is_finite())
    }

    #[test]
    fn floats_keep_their_last_bit() {
        let doc = json!([1.0715660391465826e-75, 0.1, 5e-324, f64::MAX]);
        let bytes = encode_value(&doc).unwrap();
        assert_eq!(decode_value(&bytes).unwrap(), doc);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            finite_f64().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn stored_documents_read_back_deep_equal(doc in arb_json()) {
            let bytes = encode_value(&doc).unwrap();
            prop_assert_eq!(decode_value(&bytes).unwrap(), doc);
        }

        #[test]
        fn floats_read_back_bit_exact(f in finite_f64()) {
            let bytes = encode_value(&f).unwrap();
            let back: f64 = decode_value_as(&bytes).unwrap();
            prop_assert_eq!(back.to_bits(), f.to_bits());
        }
    }
}
