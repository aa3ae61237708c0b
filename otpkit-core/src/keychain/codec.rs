//! Conversion between [`PersistentToken`] and stored item attributes.
//!
//! A stored entry splits a record into three attributes:
//!
//! ```text
//! account  = identifier (UTF-8)            the store's own key
//! secret   = raw HMAC key bytes            never wrapped in any text encoding
//! metadata = CBOR { "url": text,           otpauth:// form of the token
//!                   "correlation"?: bytes, opaque, omitted when absent
//!                   "version"?: uint }     reserved, omitted by this writer
//! ```

use serde::{Deserialize, Serialize};

use super::error::{DecodeError, KeychainError, KeychainResult};
use super::platform::ItemAttributes;
use super::record::PersistentToken;
use super::{METADATA_ATTRIBUTE, SECRET_ATTRIBUTE};
use crate::token::{Secret, Token};

/// Highest metadata schema this reader understands. An absent `version` key
/// means schema 1.
const METADATA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TokenMetadata {
    url: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "correlation_bytes"
    )]
    correlation: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
}

impl TokenMetadata {
    fn serialize(&self) -> KeychainResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|err| KeychainError::Serialization(err.to_string()))?;
        Ok(bytes)
    }

    fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
        let metadata: Self = ciborium::de::from_reader(bytes)
            .map_err(|err| DecodeError::UnreadableMetadata(err.to_string()))?;
        if let Some(version) = metadata.version.filter(|v| *v > METADATA_VERSION) {
            log::debug!("reading metadata schema {version} as schema {METADATA_VERSION}");
        }
        Ok(metadata)
    }
}

/// Writes correlation data as a CBOR byte string.
///
/// Reading also accepts an array of small integers, the shape serde gives a
/// plain `Vec<u8>`.
mod correlation_bytes {
    use ciborium::Value;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)] // signature required by `serde(with)`
    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_bytes(bytes),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bytes(bytes)) => Ok(Some(bytes)),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| {
                    item.as_integer()
                        .and_then(|int| u8::try_from(int).ok())
                        .ok_or_else(|| D::Error::custom("correlation array holds a non-byte value"))
                })
                .collect::<Result<Vec<u8>, _>>()
                .map(Some),
            Some(_) => Err(D::Error::custom("correlation is not a byte string")),
        }
    }
}

/// The attributes written to the store for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedRecord {
    /// Store key of the entry.
    pub account: String,
    /// Raw key bytes.
    pub secret: Vec<u8>,
    /// CBOR metadata map.
    pub metadata: Vec<u8>,
}

impl SerializedRecord {
    /// The secret and metadata attributes, keyed by their store field names.
    #[must_use]
    pub fn into_attributes(self) -> ItemAttributes {
        ItemAttributes::from([
            (SECRET_ATTRIBUTE.to_owned(), self.secret),
            (METADATA_ATTRIBUTE.to_owned(), self.metadata),
        ])
    }
}

/// Encodes a record into its stored attributes.
///
/// # Errors
///
/// Returns [`KeychainError::ConfigurationEncoding`] if the token has no URL
/// form, or [`KeychainError::Serialization`] if the metadata cannot be written.
pub fn encode(record: &PersistentToken) -> KeychainResult<SerializedRecord> {
    let url = record
        .token()
        .to_url()
        .map_err(KeychainError::ConfigurationEncoding)?;
    let metadata = TokenMetadata {
        url: url.into(),
        correlation: record.correlation().map(<[u8]>::to_vec),
        version: None,
    };
    Ok(SerializedRecord {
        account: record.identifier().to_owned(),
        secret: record.secret().expose().to_vec(),
        metadata: metadata.serialize()?,
    })
}

/// Rebuilds the record stored under `identifier` from its attributes.
///
/// # Errors
///
/// Returns the [`DecodeError`] describing the first missing or unreadable part,
/// checking the secret before the metadata.
pub fn decode(
    attributes: &ItemAttributes,
    identifier: &str,
) -> Result<PersistentToken, DecodeError> {
    let secret = attributes
        .get(SECRET_ATTRIBUTE)
        .ok_or(DecodeError::MissingSecret)?;
    let metadata_bytes = attributes
        .get(METADATA_ATTRIBUTE)
        .ok_or(DecodeError::MissingMetadata)?;
    let metadata = TokenMetadata::deserialize(metadata_bytes)?;
    let token = Token::from_url(&metadata.url).map_err(DecodeError::InvalidConfiguration)?;
    Ok(PersistentToken::new(
        identifier.to_owned(),
        token,
        Secret::from_slice(secret),
        metadata.correlation,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Algorithm, Factor, Generator, TokenUrlError};

    fn record(correlation: Option<Vec<u8>>) -> PersistentToken {
        PersistentToken::new(
            "6F9619FF-8B86-D011-B42D-00C04FC964FF".to_owned(),
            Token::new(
                "alice@example.com",
                "Example",
                Generator::new(Factor::Counter(9), Algorithm::Sha256, 8),
            ),
            Secret::from_slice(&[0x00, 0xff, 0x10, 0x80, 0x00]),
            correlation,
        )
    }

    fn metadata_bytes(metadata: &TokenMetadata) -> Vec<u8> {
        metadata.serialize().expect("serialize")
    }

    #[test]
    fn test_round_trip() {
        for correlation in [None, Some(Vec::new()), Some(vec![0xde, 0xad, 0xbe, 0xef])] {
            let original = record(correlation);
            let encoded = encode(&original).expect("encode");
            let attributes = encoded.into_attributes();
            let decoded = decode(&attributes, original.identifier()).expect("decode");
            assert_eq!(decoded.identifier(), original.identifier());
            assert_eq!(decoded.token(), original.token());
            assert_eq!(decoded.secret(), original.secret());
            assert_eq!(decoded.correlation(), original.correlation());
        }
    }

    #[test]
    fn test_secret_stored_verbatim_and_identifier_not_in_metadata() {
        let original = record(None);
        let encoded = encode(&original).expect("encode");
        assert_eq!(encoded.secret, vec![0x00, 0xff, 0x10, 0x80, 0x00]);
        assert_eq!(encoded.account, original.identifier());
        let metadata = TokenMetadata::deserialize(&encoded.metadata).expect("metadata");
        assert!(!metadata.url.contains(original.identifier()));
        assert!(metadata.version.is_none());
    }

    fn metadata_value(bytes: &[u8]) -> Vec<(ciborium::Value, ciborium::Value)> {
        match ciborium::de::from_reader(bytes).expect("cbor") {
            ciborium::Value::Map(entries) => entries,
            other => panic!("metadata is not a map: {other:?}"),
        }
    }

    #[test]
    fn test_correlation_written_as_byte_string() {
        let encoded = encode(&record(Some(vec![1, 2, 3]))).expect("encode");
        let entries = metadata_value(&encoded.metadata);
        let correlation = entries
            .iter()
            .find(|(key, _)| key.as_text() == Some("correlation"))
            .map(|(_, value)| value);
        assert_eq!(correlation, Some(&ciborium::Value::Bytes(vec![1, 2, 3])));

        let without = encode(&record(None)).expect("encode");
        assert!(metadata_value(&without.metadata)
            .iter()
            .all(|(key, _)| key.as_text() != Some("correlation")));
    }

    #[test]
    fn test_correlation_read_from_integer_array() {
        let value = ciborium::Value::Map(vec![
            (
                ciborium::Value::Text("url".to_owned()),
                ciborium::Value::Text("otpauth://totp/alice?issuer=Example".to_owned()),
            ),
            (
                ciborium::Value::Text("correlation".to_owned()),
                ciborium::Value::Array(vec![7.into(), 255.into()]),
            ),
        ]);
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&value, &mut bytes).expect("serialize");
        let attributes = ItemAttributes::from([
            (SECRET_ATTRIBUTE.to_owned(), b"key".to_vec()),
            (METADATA_ATTRIBUTE.to_owned(), bytes),
        ]);
        let decoded = decode(&attributes, "id").expect("decode");
        assert_eq!(decoded.correlation(), Some(&[7u8, 255][..]));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let original = record(Some(vec![1, 2, 3]));
        assert_eq!(encode(&original).expect("encode"), encode(&original).expect("encode"));
    }

    #[test]
    fn test_encode_rejects_unencodable_token() {
        let original = PersistentToken::new(
            "id".to_owned(),
            Token::new("a", "b", Generator::new(Factor::Counter(0), Algorithm::Sha1, 4)),
            Secret::from_slice(b"k"),
            None,
        );
        match encode(&original) {
            Err(KeychainError::ConfigurationEncoding(TokenUrlError::UnsupportedDigits(4))) => {}
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_missing_secret_checked_first() {
        let attributes = ItemAttributes::new();
        assert_eq!(decode(&attributes, "id").err(), Some(DecodeError::MissingSecret));
    }

    #[test]
    fn test_distinct_decode_failures() {
        let valid = encode(&record(None)).expect("encode");

        let only_metadata =
            ItemAttributes::from([(METADATA_ATTRIBUTE.to_owned(), valid.metadata.clone())]);
        assert_eq!(decode(&only_metadata, "id").err(), Some(DecodeError::MissingSecret));

        let only_secret =
            ItemAttributes::from([(SECRET_ATTRIBUTE.to_owned(), valid.secret.clone())]);
        assert_eq!(decode(&only_secret, "id").err(), Some(DecodeError::MissingMetadata));

        let garbage = ItemAttributes::from([
            (SECRET_ATTRIBUTE.to_owned(), valid.secret.clone()),
            (METADATA_ATTRIBUTE.to_owned(), b"not cbor at all".to_vec()),
        ]);
        assert!(matches!(
            decode(&garbage, "id").err(),
            Some(DecodeError::UnreadableMetadata(_))
        ));

        let bad_url = ItemAttributes::from([
            (SECRET_ATTRIBUTE.to_owned(), valid.secret),
            (
                METADATA_ATTRIBUTE.to_owned(),
                metadata_bytes(&TokenMetadata {
                    url: "otpauth://motp/alice".to_owned(),
                    correlation: None,
                    version: None,
                }),
            ),
        ]);
        assert_eq!(
            decode(&bad_url, "id").err(),
            Some(DecodeError::InvalidConfiguration(TokenUrlError::InvalidType(
                "motp".to_owned()
            )))
        );
    }

    #[test]
    fn test_newer_schema_and_unknown_keys_still_read() {
        #[derive(Serialize)]
        struct FutureMetadata {
            url: String,
            version: u32,
            label_color: String,
        }
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(
            &FutureMetadata {
                url: "otpauth://totp/alice?issuer=Example".to_owned(),
                version: 2,
                label_color: "blue".to_owned(),
            },
            &mut bytes,
        )
        .expect("serialize");
        let attributes = ItemAttributes::from([
            (SECRET_ATTRIBUTE.to_owned(), b"key".to_vec()),
            (METADATA_ATTRIBUTE.to_owned(), bytes),
        ]);
        let decoded = decode(&attributes, "id").expect("decode");
        assert_eq!(decoded.token().name, "alice");
        assert_eq!(decoded.correlation(), None);
    }
}
