//! Object ID (SHA-256 hash) representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// The length of a SHA-256 hash in bytes.
pub const OID_BYTES: usize = 32;

/// The length of a SHA-256 hash as a hexadecimal string.
pub const OID_HEX_LEN: usize = 64;

/// A content-addressed identifier (SHA-256 hash).
///
/// Identifies commits, trees, database blobs and licence texts. Two
/// objects with identical canonical content always share an `Oid`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    bytes: [u8; OID_BYTES],
}

impl Oid {
    /// Creates an Oid from a 64-character hexadecimal string.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbgraph::objects::Oid;
    ///
    /// let hex = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    /// let oid = Oid::from_hex(hex).unwrap();
    /// assert_eq!(oid.to_hex(), hex);
    /// ```
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != OID_HEX_LEN {
            return Err(Error::InvalidOid(s.to_string()));
        }

        let mut bytes = [0u8; OID_BYTES];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| Error::InvalidOid(s.to_string()))?;
        Ok(Oid { bytes })
    }

    /// Creates an Oid from a 32-byte array.
    pub fn from_bytes(bytes: [u8; OID_BYTES]) -> Self {
        Oid { bytes }
    }

    /// Returns the lowercase hexadecimal representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Returns a short (8-character) representation for display.
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }

    /// Returns a reference to the raw bytes.
    pub fn as_bytes(&self) -> &[u8; OID_BYTES] {
        &self.bytes
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.short())
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Oid::from_hex(s)
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Oid::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
