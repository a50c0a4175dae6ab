//! Content hashing: the SHA-256 identity of an artifact.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length in bytes of a [`ContentHash`].
pub const HASH_LEN: usize = 32;

/// Errors produced when parsing a [`ContentHash`] from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// The input is not valid hexadecimal.
    #[error("Invalid content hash '{0}': not a hex string")]
    NotHex(String),

    /// The input decodes to the wrong number of bytes.
    #[error("Invalid content hash length: expected 32 bytes, got {0}")]
    Length(usize),
}

/// SHA-256 digest of an artifact's bytes; the primary key of the index.
///
/// Ordering is plain lexicographic byte comparison, which is what the index
/// uses to break ties between descriptors.
///
/// # Example
///
/// ```
/// use depot_schema::ContentHash;
///
/// let hash = ContentHash::of_bytes(b"hello");
/// let parsed: ContentHash = hash.to_hex().parse().unwrap();
/// assert_eq!(hash, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a lowercase or uppercase hex string, with or without a `sha256:` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the input is not 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let hex_part = s.strip_prefix("sha256:").unwrap_or(s);
        let raw = hex::decode(hex_part).map_err(|_| HashError::NotHex(s.to_string()))?;
        let bytes: [u8; HASH_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| HashError::Length(raw.len()))?;
        Ok(Self(bytes))
    }

    /// Compute the hash of an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Compute the hash of a file, streaming it in 64KB blocks.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = ContentHasher::new();
        let mut buffer = [0u8; 65536];
        loop {
            let count = file.read(&mut buffer)?;
            if count == 0 {
                break;
            }
            hasher.update(&buffer[..count]);
        }
        Ok(hasher.finalize())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex form, as used in the cache layout and the index file.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental SHA-256 over a byte stream, producing a [`ContentHash`].
#[derive(Debug, Clone, Default)]
pub struct ContentHasher(Sha256);

impl ContentHasher {
    /// Start a new digest.
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    /// Feed the next block of bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Consume the hasher and return the digest.
    pub fn finalize(self) -> ContentHash {
        ContentHash(self.0.finalize().into())
    }
}
