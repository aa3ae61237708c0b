//! Common test utilities shared across integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use otpkit_core::keychain::platform::memory::MemoryItemStore;
use otpkit_core::keychain::{METADATA_ATTRIBUTE, SECRET_ATTRIBUTE};
use otpkit_core::{Keychain, KeychainConfig, Secret};

/// Routes library `log` output to the test writer. Set `RUST_LOG` to see it.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Opens a keychain for `service` over a fresh shared in-memory store.
pub fn keychain(service: &str) -> (Arc<MemoryItemStore>, Keychain) {
    init_logging();
    let store = Arc::new(MemoryItemStore::new());
    let keychain = Keychain::new(&KeychainConfig::new(service), store.clone()).expect("keychain");
    (store, keychain)
}

/// A random 20-byte key, the size most issuers hand out.
pub fn random_secret() -> Secret {
    Secret::new(rand::random::<[u8; 20]>().to_vec())
}

/// Encodes a metadata map holding only `url`, the way a writer would.
pub fn metadata_with_url(url: &str) -> Vec<u8> {
    let value = ciborium::Value::Map(vec![(
        ciborium::Value::Text("url".to_owned()),
        ciborium::Value::Text(url.to_owned()),
    )]);
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&value, &mut bytes).expect("serialize metadata");
    bytes
}

/// Attribute map with the given secret and metadata, either of which may be
/// left out.
pub fn raw_attributes(
    secret: Option<&[u8]>,
    metadata: Option<Vec<u8>>,
) -> HashMap<String, Vec<u8>> {
    let mut attributes = HashMap::new();
    if let Some(secret) = secret {
        attributes.insert(SECRET_ATTRIBUTE.to_owned(), secret.to_vec());
    }
    if let Some(metadata) = metadata {
        attributes.insert(METADATA_ATTRIBUTE.to_owned(), metadata);
    }
    attributes
}
