//! OpenDAL Operator factory for sealdrop storage backends

use anyhow::{Context, Result};
use opendal::Operator;
use secrecy::{ExposeSecret, SecretString};
use sealdrop_core::config::{StorageBackend, StorageConfig};

/// S3 credentials, read from the environment for direct use.
#[derive(Debug, Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl S3Credentials {
    /// Reads AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY, falling back to the
    /// SEALDROP_-prefixed names.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .or_else(|_| std::env::var("SEALDROP_ACCESS_KEY_ID"))
            .context(
                "S3 credentials not set\n\
                 Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY environment variables.",
            )?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .or_else(|_| std::env::var("SEALDROP_SECRET_ACCESS_KEY"))
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;

        Ok(Self {
            access_key_id,
            secret_access_key: SecretString::from(secret_access_key),
        })
    }
}

/// Build an OpenDAL Operator for the configured backend.
///
/// S3 credentials are only consulted for the `s3` backend; pass `None` to
/// read them from the environment.
pub fn build_operator(storage: &StorageConfig, creds: Option<S3Credentials>) -> Result<Operator> {
    let op = match storage.backend {
        StorageBackend::Memory => Operator::new(opendal::services::Memory::default())
            .context("creating in-memory operator")?
            .finish(),
        StorageBackend::Fs => {
            let root = storage.resolved_root();
            let root = root
                .to_str()
                .with_context(|| format!("storage root is not UTF-8: {}", root.display()))?;
            Operator::new(opendal::services::Fs::default().root(root))
                .context("creating filesystem operator")?
                .layer(opendal::layers::LoggingLayer::default())
                .finish()
        }
        StorageBackend::S3 => {
            let creds = match creds {
                Some(c) => c,
                None => S3Credentials::from_env()?,
            };
            build_s3_operator(storage, &creds)?
        }
    };
    Ok(op)
}

/// Build an S3 operator (SeaweedFS, MinIO, AWS).
///
/// If `enforce_tls` is true and the endpoint uses HTTP, this returns an error.
/// Otherwise, a warning is logged for non-HTTPS endpoints.
fn build_s3_operator(storage: &StorageConfig, creds: &S3Credentials) -> Result<Operator> {
    if storage.endpoint.starts_with("http://") {
        if storage.enforce_tls {
            anyhow::bail!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set storage.enforce_tls = false for local development.",
                storage.endpoint
            );
        }
        tracing::warn!(
            endpoint = %storage.endpoint,
            "S3 endpoint uses plaintext HTTP; credentials are transmitted unencrypted. \
             Set storage.enforce_tls = true and use HTTPS in production."
        );
    }

    // Path-style addressing is the default, which SeaweedFS and MinIO need
    let builder = opendal::services::S3::default()
        .endpoint(&storage.endpoint)
        .region(&storage.region)
        .bucket(&storage.bucket)
        .access_key_id(&creds.access_key_id)
        .secret_access_key(creds.secret_access_key.expose_secret());

    let op = Operator::new(builder)
        .context("creating OpenDAL S3 operator")?
        .layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(5)
                .with_jitter(),
        )
        .finish();

    Ok(op)
}
