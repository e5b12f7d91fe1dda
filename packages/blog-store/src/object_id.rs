//! ObjectId-style document identifiers.
//!
//! Layout (12 bytes): 4-byte big-endian unix seconds, 5 bytes chosen once
//! per process, 3-byte big-endian counter.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StoreError;

const COUNTER_MASK: u32 = 0x00ff_ffff;

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

/// Opaque, store-assigned document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generates a new identifier.
    pub fn new() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let unique = PROCESS_UNIQUE.get_or_init(|| rand::thread_rng().gen());
        let counter = COUNTER
            .get_or_init(|| AtomicU32::new(rand::thread_rng().gen_range(0..=COUNTER_MASK)))
            .fetch_add(1, Ordering::Relaxed)
            & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(unique);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        Self(bytes)
    }

    /// Builds an identifier from raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Seconds since the unix epoch encoded in the identifier.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Lowercase 24 character hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 24 {
            return Err(StoreError::InvalidId(s.to_string()));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| StoreError::InvalidId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
