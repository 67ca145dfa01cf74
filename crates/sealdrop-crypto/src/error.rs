use std::fmt;

use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Blob fields, in wire order. Used to report where parsing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobField {
    Salt,
    Nonce,
    AuthTag,
    NameLen,
    Name,
    MimeLen,
    Mime,
}

impl fmt::Display for BlobField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlobField::Salt => "salt",
            BlobField::Nonce => "nonce",
            BlobField::AuthTag => "auth tag",
            BlobField::NameLen => "name length",
            BlobField::Name => "name",
            BlobField::MimeLen => "media type length",
            BlobField::Mime => "media type",
        };
        f.write_str(name)
    }
}

/// Errors from key derivation, encryption and blob framing.
///
/// None of the variants carry passphrase or key material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("truncated blob: {field} needs {needed} bytes, {remaining} remaining")]
    TruncatedBlob {
        field: BlobField,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid blob metadata: {field} is not valid UTF-8")]
    InvalidMetadata { field: BlobField },

    #[error("blob has no ciphertext")]
    EmptyCiphertext,

    #[error("authentication failed")]
    Authentication,

    #[error("refusing to seal an empty file")]
    EmptyPlaintext,
}

impl CryptoError {
    /// True for every failure a retrieval caller should report as a plain
    /// "decryption failed", without saying which check tripped.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            CryptoError::TruncatedBlob { .. }
                | CryptoError::InvalidMetadata { .. }
                | CryptoError::EmptyCiphertext
                | CryptoError::Authentication
        )
    }
}
