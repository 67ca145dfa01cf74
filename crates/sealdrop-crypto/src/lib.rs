//! sealdrop-crypto: passphrase encryption for SealDrop blobs
//!
//! Architecture: one passphrase, one file, one self-describing blob.
//!
//! Pipeline: passphrase + random salt → Argon2id → ChaCha20-Poly1305 → frame → store
//!
//! Blob layout (all lengths little-endian):
//! ```text
//! [16 salt][12 nonce][16 tag][4 name_len][name][4 mime_len][mime][ciphertext]
//! ```
//!
//! The derived key never leaves the [`encrypt`]/[`decrypt`] call that created
//! it and is zeroized on drop.

pub mod blob;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod kdf;

pub use blob::{deserialize, serialize, BlobReader, BlobView, ParsedBlob};
pub use codec::{decrypt, encrypt, EncryptionMaterial, Sealed};
pub use envelope::{open, seal, OpenedFile};
pub use error::{BlobField, CryptoError, CryptoResult};
pub use kdf::{derive_key, DerivedKey, KdfParams};

/// Size of a derived ChaCha20-Poly1305 key (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the Argon2id salt stored in every blob
pub const SALT_SIZE: usize = 16;

/// Size of a ChaCha20-Poly1305 nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Width of the metadata length prefixes
pub const LEN_PREFIX_SIZE: usize = 4;

/// Fixed part of the blob header: salt + nonce + tag
pub const FIXED_HEADER_SIZE: usize = SALT_SIZE + NONCE_SIZE + TAG_SIZE;
