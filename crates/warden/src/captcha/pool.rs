//! Pool: immutable pre-generated CAPTCHA set with disk persistence.
//!
//! The pool is built offline (`--generate`) and loaded once at startup.
//! Every handler shares it through an `Arc` without locking.
//!
//! File layout (bincode):
//! ```text
//! PoolEnvelope { magic, version, checksum = hex(sha256(payload)), payload }
//! payload = bincode(PoolData { map: hash -> base64 JPEG, keys })
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use warden_common::WardenError;

/// Identifies a Warden pool file
const POOL_MAGIC: &str = "WARDEN-POOL";

/// Current pool file format version
const POOL_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PoolEnvelope {
    magic: String,
    version: u32,
    checksum: String,
    payload: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct PoolData {
    map: HashMap<String, String>,
    keys: Vec<String>,
}

/// Pre-generated CAPTCHAs keyed by challenge hash
#[derive(Debug)]
pub struct Pool {
    /// challenge hash -> base64-encoded JPEG
    map: HashMap<String, String>,
    /// Every key of `map`, for uniform sampling
    keys: Vec<String>,
}

impl Pool {
    /// Build a pool from a complete map. Keys are derived from the map.
    pub fn from_map(map: HashMap<String, String>) -> Result<Self, WardenError> {
        let keys = map.keys().cloned().collect();
        Self::from_parts(map, keys)
    }

    fn from_parts(map: HashMap<String, String>, keys: Vec<String>) -> Result<Self, WardenError> {
        if map.is_empty() {
            return Err(WardenError::Pool("pool is empty".to_string()));
        }

        if keys.len() != map.len() {
            return Err(WardenError::Pool(format!(
                "key list has {} entries, map has {}",
                keys.len(),
                map.len()
            )));
        }

        let mut seen = HashSet::with_capacity(keys.len());
        for key in &keys {
            if !map.contains_key(key) || !seen.insert(key.as_str()) {
                return Err(WardenError::Pool(
                    "database values are not synchronized".to_string(),
                ));
            }
        }

        Ok(Self { map, keys })
    }

    /// Number of CAPTCHAs in the pool
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Image for a challenge hash
    pub fn get(&self, hash: &str) -> Option<&str> {
        self.map.get(hash).map(String::as_str)
    }

    #[cfg(test)]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Uniformly sample a `(challenge hash, base64 image)` pair
    pub fn sample_random(&self) -> (&str, &str) {
        let idx = rand::rng().random_range(0..self.keys.len());
        let key = self.keys[idx].as_str();
        // keys and map are checked to agree at construction
        (key, self.get(key).unwrap_or_default())
    }

    /// Load a pool file written by [`Pool::save`]
    pub fn load(path: &Path) -> Result<Self, WardenError> {
        let data = std::fs::read(path)
            .map_err(|e| WardenError::Pool(format!("{}: {e}", path.display())))?;
        Self::decode(&data)
    }

    /// Write the pool to `path`, replacing any previous file
    pub fn save(&self, path: &Path) -> Result<(), WardenError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let data = self.encode()?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)?;

        tracing::debug!(count = self.len(), path = ?path, "Wrote CAPTCHA pool");
        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>, WardenError> {
        let payload = bincode::serialize(&PoolData {
            map: self.map.clone(),
            keys: self.keys.clone(),
        })
        .map_err(|e| WardenError::Pool(e.to_string()))?;

        let envelope = PoolEnvelope {
            magic: POOL_MAGIC.to_string(),
            version: POOL_VERSION,
            checksum: hex::encode(Sha256::digest(&payload)),
            payload,
        };

        bincode::serialize(&envelope).map_err(|e| WardenError::Pool(e.to_string()))
    }

    fn decode(data: &[u8]) -> Result<Self, WardenError> {
        let envelope: PoolEnvelope = bincode::deserialize(data)
            .map_err(|e| WardenError::Pool(format!("corrupt pool file: {e}")))?;

        if envelope.magic != POOL_MAGIC {
            return Err(WardenError::Pool("not a CAPTCHA pool file".to_string()));
        }
        if envelope.version != POOL_VERSION {
            return Err(WardenError::Pool(format!(
                "unsupported pool version {}",
                envelope.version
            )));
        }
        if hex::encode(Sha256::digest(&envelope.payload)) != envelope.checksum {
            return Err(WardenError::Pool("pool checksum mismatch".to_string()));
        }

        let data: PoolData = bincode::deserialize(&envelope.payload)
            .map_err(|e| WardenError::Pool(format!("corrupt pool payload: {e}")))?;

        Self::from_parts(data.map, data.keys)
    }
}
