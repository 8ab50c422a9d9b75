//! Object keys.
//!
//! Keys are opaque byte strings chosen by clients. The proxy never interprets
//! them; it only needs a stable, cheap digest to correlate log lines and
//! balancer requests for the same object.

use std::fmt;

use xxhash_rust::xxh3::xxh3_64;

/// Stable 64-bit digest of a key.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct KeyId(pub u64);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Client-supplied object key.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Key {
    bytes: Vec<u8>,
}

impl Key {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Digest of the key bytes. Identical keys always yield identical ids.
    #[inline]
    pub fn id(&self) -> KeyId {
        KeyId(xxh3_64(&self.bytes))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::new(s.as_bytes())
    }
}

impl From<&[u8]> for Key {
    fn from(b: &[u8]) -> Self {
        Key::new(b)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}
