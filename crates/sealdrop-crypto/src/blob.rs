//! Blob framing
//!
//! Wire format (binary, byte-exact):
//! ```text
//! [16 bytes: salt][12 bytes: nonce][16 bytes: Poly1305 tag]
//! [4 bytes: name_len, u32 LE][name_len bytes: UTF-8 filename]
//! [4 bytes: mime_len, u32 LE][mime_len bytes: UTF-8 media type]
//! [remaining bytes: ciphertext]
//! ```
//!
//! Parsing walks the fields strictly in order through a [`BlobReader`], which
//! checks the remaining length before every read. A length prefix can claim
//! anything; it is only ever compared, never trusted for indexing.

use crate::codec::EncryptionMaterial;
use crate::error::{BlobField, CryptoError, CryptoResult};
use crate::{FIXED_HEADER_SIZE, LEN_PREFIX_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE};

/// Bounds-checked cursor over a blob.
#[derive(Debug, Clone)]
pub struct BlobReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> BlobReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Take exactly `n` bytes, or fail without moving the cursor.
    pub fn take_exact(&mut self, n: usize, field: BlobField) -> CryptoResult<&'a [u8]> {
        let remaining = self.remaining();
        if remaining < n {
            return Err(CryptoError::TruncatedBlob {
                field,
                needed: n,
                remaining,
            });
        }
        let bytes = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    pub fn take_array<const N: usize>(&mut self, field: BlobField) -> CryptoResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take_exact(N, field)?);
        Ok(out)
    }

    pub fn take_u32_le(&mut self, field: BlobField) -> CryptoResult<u32> {
        self.take_array::<LEN_PREFIX_SIZE>(field).map(u32::from_le_bytes)
    }

    /// Read a u32 length prefix, then that many bytes as UTF-8.
    pub fn take_str(&mut self, len_field: BlobField, field: BlobField) -> CryptoResult<&'a str> {
        let len = self.take_u32_le(len_field)?;
        // Anything that does not fit in usize cannot fit in the buffer either
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        let bytes = self.take_exact(len, field)?;
        std::str::from_utf8(bytes).map_err(|_| CryptoError::InvalidMetadata { field })
    }

    /// Consume everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.offset..];
        self.offset = self.buf.len();
        bytes
    }
}

/// Zero-copy view of a parsed blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobView<'a> {
    pub material: EncryptionMaterial,
    pub filename: &'a str,
    pub media_type: &'a str,
    pub ciphertext: &'a [u8],
}

impl<'a> BlobView<'a> {
    /// Parse `blob` field by field. Fails on the first field that does not fit.
    pub fn parse(blob: &'a [u8]) -> CryptoResult<Self> {
        let mut reader = BlobReader::new(blob);

        let salt = reader.take_array::<SALT_SIZE>(BlobField::Salt)?;
        let nonce = reader.take_array::<NONCE_SIZE>(BlobField::Nonce)?;
        let auth_tag = reader.take_array::<TAG_SIZE>(BlobField::AuthTag)?;
        let filename = reader.take_str(BlobField::NameLen, BlobField::Name)?;
        let media_type = reader.take_str(BlobField::MimeLen, BlobField::Mime)?;

        let ciphertext = reader.rest();
        if ciphertext.is_empty() {
            return Err(CryptoError::EmptyCiphertext);
        }

        Ok(Self {
            material: EncryptionMaterial {
                salt,
                nonce,
                auth_tag,
            },
            filename,
            media_type,
            ciphertext,
        })
    }

    /// Length of everything in front of the ciphertext.
    pub fn header_len(&self) -> usize {
        FIXED_HEADER_SIZE + 2 * LEN_PREFIX_SIZE + self.filename.len() + self.media_type.len()
    }

    pub fn to_parsed(&self) -> ParsedBlob {
        ParsedBlob {
            material: self.material,
            filename: self.filename.to_string(),
            media_type: self.media_type.to_string(),
            ciphertext: self.ciphertext.to_vec(),
        }
    }
}

/// Owned form of a parsed blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlob {
    pub material: EncryptionMaterial,
    pub filename: String,
    pub media_type: String,
    pub ciphertext: Vec<u8>,
}

/// Frame encryption material, metadata and ciphertext into one blob.
///
/// Fails only if a metadata field is longer than `u32::MAX` bytes.
pub fn serialize(
    material: &EncryptionMaterial,
    filename: &str,
    media_type: &str,
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let name_len = len_prefix(filename, "filename")?;
    let mime_len = len_prefix(media_type, "media type")?;

    let mut blob = Vec::with_capacity(
        FIXED_HEADER_SIZE
            + 2 * LEN_PREFIX_SIZE
            + filename.len()
            + media_type.len()
            + ciphertext.len(),
    );
    blob.extend_from_slice(&material.salt);
    blob.extend_from_slice(&material.nonce);
    blob.extend_from_slice(&material.auth_tag);
    blob.extend_from_slice(&name_len.to_le_bytes());
    blob.extend_from_slice(filename.as_bytes());
    blob.extend_from_slice(&mime_len.to_le_bytes());
    blob.extend_from_slice(media_type.as_bytes());
    blob.extend_from_slice(ciphertext);
    Ok(blob)
}

/// Parse a blob into owned fields.
pub fn deserialize(blob: &[u8]) -> CryptoResult<ParsedBlob> {
    BlobView::parse(blob).map(|view| view.to_parsed())
}

fn len_prefix(field: &str, what: &str) -> CryptoResult<u32> {
    u32::try_from(field.len())
        .map_err(|_| CryptoError::InvalidInput(format!("{what} longer than u32::MAX bytes")))
}
