//! Prometheus counters for the upload/download API

use prometheus_client::{metrics::counter::Counter, registry::Registry};

#[derive(Debug, Default, Clone)]
pub struct Metrics {
    pub uploads: Counter,
    pub downloads: Counter,
    pub decrypt_failures: Counter,
    pub bytes_sealed: Counter,
}

impl Metrics {
    /// Create the counters and register them under the `sealdrop_` prefix.
    pub fn register(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        registry.register(
            "uploads",
            "Files sealed and stored",
            metrics.uploads.clone(),
        );
        registry.register(
            "downloads",
            "Files successfully decrypted and returned",
            metrics.downloads.clone(),
        );
        registry.register(
            "decrypt_failures",
            "Downloads refused because the blob did not decrypt",
            metrics.decrypt_failures.clone(),
        );
        registry.register(
            "plaintext_bytes_sealed",
            "Plaintext bytes accepted for sealing",
            metrics.bytes_sealed.clone(),
        );
        metrics
    }
}

pub fn new_registry() -> Registry {
    Registry::with_prefix("sealdrop")
}
