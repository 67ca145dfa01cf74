//! File-level seal/open: codec + framing in one call
//!
//! `seal` is the upload path (plaintext file → blob), `open` the download
//! path (blob → plaintext file). Both are CPU- and memory-bound; async
//! callers should run them on a blocking pool.

use secrecy::SecretString;

use crate::blob::{self, BlobView};
use crate::codec;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::KdfParams;

/// A decrypted file with the metadata it was sealed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedFile {
    pub filename: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// Encrypt a file and frame it into a blob.
///
/// Zero-byte files are refused with [`CryptoError::EmptyPlaintext`]: the
/// resulting header-only blob would be indistinguishable from a damaged one
/// on the way back.
pub fn seal(
    data: &[u8],
    filename: &str,
    media_type: &str,
    passphrase: &SecretString,
    params: &KdfParams,
) -> CryptoResult<Vec<u8>> {
    if data.is_empty() {
        return Err(CryptoError::EmptyPlaintext);
    }

    let sealed = codec::encrypt(data, passphrase, params)?;
    let blob = blob::serialize(&sealed.material, filename, media_type, &sealed.ciphertext)?;

    tracing::debug!(
        plaintext_bytes = data.len(),
        blob_bytes = blob.len(),
        "sealed file"
    );
    Ok(blob)
}

/// Parse a blob and decrypt it.
///
/// The blob is fully parsed before any key derivation, so malformed input
/// never costs an Argon2 run.
pub fn open(
    blob: &[u8],
    passphrase: &SecretString,
    params: &KdfParams,
) -> CryptoResult<OpenedFile> {
    let view = BlobView::parse(blob)?;
    let m = &view.material;

    let data = codec::decrypt(
        view.ciphertext,
        &m.nonce,
        &m.auth_tag,
        &m.salt,
        passphrase,
        params,
    )?;

    Ok(OpenedFile {
        filename: view.filename.to_string(),
        media_type: view.media_type.to_string(),
        data,
    })
}
