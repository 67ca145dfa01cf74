//! Property tests for the seal/open protocol.
//!
//! Argon2 runs once per case, so the KDF is kept small and the case count
//! modest.

use proptest::prelude::*;
use sealdrop_crypto::{
    decrypt, deserialize, encrypt, open, seal, serialize, BlobView, CryptoError,
    EncryptionMaterial, KdfParams, FIXED_HEADER_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE,
};
use secrecy::SecretString;

fn params() -> KdfParams {
    KdfParams {
        mem_cost_kib: 256,
        time_cost: 1,
        parallelism: 1,
    }
}

fn passphrase() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 !-]{1,32}"
}

fn metadata() -> impl Strategy<Value = String> {
    "\\PC{0,40}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn decrypt_inverts_encrypt(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        pass in passphrase(),
    ) {
        let pass = SecretString::from(pass);
        let sealed = encrypt(&data, &pass, &params()).unwrap();
        let m = sealed.material;
        let plain =
            decrypt(&sealed.ciphertext, &m.nonce, &m.auth_tag, &m.salt, &pass, &params()).unwrap();
        prop_assert_eq!(plain, data);
    }

    #[test]
    fn wrong_passphrase_fails_authentication(
        data in proptest::collection::vec(any::<u8>(), 1..512),
        a in passphrase(),
        b in passphrase(),
    ) {
        prop_assume!(a != b);
        let a = SecretString::from(a);
        let blob = seal(&data, "f", "application/octet-stream", &a, &params()).unwrap();
        let result = open(&blob, &SecretString::from(b), &params());
        prop_assert_eq!(result, Err(CryptoError::Authentication));
    }

    #[test]
    fn framing_roundtrip(
        salt in any::<[u8; SALT_SIZE]>(),
        nonce in any::<[u8; NONCE_SIZE]>(),
        auth_tag in any::<[u8; TAG_SIZE]>(),
        filename in metadata(),
        media_type in metadata(),
        ciphertext in proptest::collection::vec(any::<u8>(), 1..1024),
    ) {
        let material = EncryptionMaterial { salt, nonce, auth_tag };
        let blob = serialize(&material, &filename, &media_type, &ciphertext).unwrap();
        let parsed = deserialize(&blob).unwrap();

        prop_assert_eq!(parsed.material, material);
        prop_assert_eq!(parsed.filename, filename);
        prop_assert_eq!(parsed.media_type, media_type);
        prop_assert_eq!(parsed.ciphertext, ciphertext);
    }

    #[test]
    fn truncated_header_never_panics(
        filename in metadata(),
        media_type in metadata(),
        ciphertext in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        let material = EncryptionMaterial {
            salt: [1; SALT_SIZE],
            nonce: [2; NONCE_SIZE],
            auth_tag: [3; TAG_SIZE],
        };
        let blob = serialize(&material, &filename, &media_type, &ciphertext).unwrap();
        let header_len = BlobView::parse(&blob).unwrap().header_len();

        for k in 0..blob.len() {
            let result = deserialize(&blob[..k]);
            if k < header_len {
                let truncated = matches!(result, Err(CryptoError::TruncatedBlob { .. }));
                prop_assert!(truncated, "prefix {} of {}: {:?}", k, blob.len(), result);
            } else if k == header_len {
                prop_assert_eq!(result, Err(CryptoError::EmptyCiphertext));
            } else {
                prop_assert!(result.is_ok());
            }
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = deserialize(&bytes);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn any_bit_flip_in_tag_or_ciphertext_is_detected(
        data in proptest::collection::vec(any::<u8>(), 1..128),
        pick in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let pass = SecretString::from("correct-horse");
        let blob = seal(&data, "note.txt", "text/plain", &pass, &params()).unwrap();
        let header_len = BlobView::parse(&blob).unwrap().header_len();

        // Tag region [28, 44) plus the ciphertext region [header_len, len)
        let tag_start = FIXED_HEADER_SIZE - TAG_SIZE;
        let targets: Vec<usize> = (tag_start..FIXED_HEADER_SIZE)
            .chain(header_len..blob.len())
            .collect();
        let pos = targets[pick.index(targets.len())];

        let mut tampered = blob.clone();
        tampered[pos] ^= 1 << bit;

        prop_assert_eq!(open(&tampered, &pass, &params()), Err(CryptoError::Authentication));
    }
}

#[test]
fn truncation_into_ciphertext_fails_authentication() {
    let pass = SecretString::from("correct-horse");
    let blob = seal(b"hello world", "note.txt", "text/plain", &pass, &params()).unwrap();

    let result = open(&blob[..blob.len() - 1], &pass, &params());
    assert_eq!(result, Err(CryptoError::Authentication));
}

#[test]
fn empty_plaintext_blob_is_rejected_on_parse() {
    let pass = SecretString::from("pw");
    let sealed = encrypt(b"", &pass, &params()).unwrap();
    let blob = serialize(&sealed.material, "empty.txt", "text/plain", &sealed.ciphertext).unwrap();

    assert_eq!(deserialize(&blob), Err(CryptoError::EmptyCiphertext));
}
