//! Passphrase AEAD: Argon2id key + ChaCha20-Poly1305 with a detached tag
//!
//! Every call to [`encrypt`] draws a fresh salt and nonce, so the same
//! passphrase never reuses a (key, nonce) pair. No associated data is bound;
//! the filename and media type travel in the clear in the blob header.

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Nonce, Tag,
};
use rand::RngCore;
use secrecy::SecretString;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, KdfParams};
use crate::{NONCE_SIZE, SALT_SIZE, TAG_SIZE};

/// The public half of one encryption: everything a blob needs to carry so
/// the passphrase holder can decrypt it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionMaterial {
    pub salt: [u8; SALT_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    pub auth_tag: [u8; TAG_SIZE],
}

/// Output of [`encrypt`]. `ciphertext` has the same length as the plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub material: EncryptionMaterial,
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under a key derived from `passphrase`.
///
/// Empty plaintext is accepted and yields empty ciphertext; refusing empty
/// files is the caller's policy (see [`crate::seal`]).
pub fn encrypt(
    plaintext: &[u8],
    passphrase: &SecretString,
    params: &KdfParams,
) -> CryptoResult<Sealed> {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_SIZE];
    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt, params)?;
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut ciphertext)
        .map_err(|_| CryptoError::InvalidInput("plaintext too large for a single nonce".into()))?;

    let mut auth_tag = [0u8; TAG_SIZE];
    auth_tag.copy_from_slice(tag.as_slice());

    tracing::debug!(bytes = ciphertext.len(), "encrypted payload");

    Ok(Sealed {
        material: EncryptionMaterial {
            salt,
            nonce,
            auth_tag,
        },
        ciphertext,
    })
}

/// Decrypt `ciphertext`, verifying `auth_tag` under a key re-derived from
/// `passphrase` and `salt`.
///
/// Field sizes are checked before the (expensive) key derivation. A wrong
/// passphrase and a corrupted ciphertext both surface as
/// [`CryptoError::Authentication`] with nothing to tell them apart.
pub fn decrypt(
    ciphertext: &[u8],
    nonce: &[u8],
    auth_tag: &[u8],
    salt: &[u8],
    passphrase: &SecretString,
    params: &KdfParams,
) -> CryptoResult<Vec<u8>> {
    let nonce = fixed::<NONCE_SIZE>(nonce, "nonce")?;
    let auth_tag = fixed::<TAG_SIZE>(auth_tag, "auth tag")?;
    let salt = fixed::<SALT_SIZE>(salt, "salt")?;

    let key = derive_key(passphrase, &salt, params)?;
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let mut plaintext = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&nonce),
            b"",
            &mut plaintext,
            Tag::from_slice(&auth_tag),
        )
        .map_err(|_| CryptoError::Authentication)?;

    tracing::debug!(bytes = plaintext.len(), "decrypted payload");
    Ok(plaintext)
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> CryptoResult<[u8; N]> {
    bytes.try_into().map_err(|_| {
        CryptoError::InvalidInput(format!(
            "{what} must be {N} bytes, got {}",
            bytes.len()
        ))
    })
}
