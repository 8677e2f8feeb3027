//! Enum token tables and hash recovery
//!
//! Token fields store indices into named, ordered arrays; hash fields store
//! 32-bit fingerprints of strings the game never keeps around. Both data
//! sets ship embedded as JSON and are parsed once at startup; every bank
//! instance then owns its own immutable copy, so template, source and live
//! banks can never contaminate each other even if a future build varies the
//! tables per image.
//!
//! Lookups are deliberately lenient: a missing token resolves to index 0, an
//! out-of-range index to the empty string, an unknown hash to a synthesized
//! `HASH_<n>` placeholder. None of these are error paths.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use thiserror::Error;

/// Errors from loading table data
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to parse lookup table data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid hash key \"{0}\" in lookup table data")]
    BadHashKey(String),
}

#[derive(Debug, Deserialize)]
struct RawTables {
    arrays: BTreeMap<String, Vec<String>>,
    hashes: BTreeMap<String, String>,
}

/// One bank's enum tables and hash-recovery map.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    arrays: HashMap<String, Vec<String>>,
    hashes: HashMap<u32, String>,
}

impl LookupTables {
    /// The embedded data set for the shipping game build.
    pub fn builtin() -> Result<Self, TableError> {
        Self::from_json(include_str!("tables.json"))
    }

    /// Parse table data from JSON: `arrays` of ordered token lists and
    /// `hashes` keyed by `0x`-prefixed 32-bit values.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let raw: RawTables = serde_json::from_str(json)?;

        let mut hashes = HashMap::with_capacity(raw.hashes.len());
        for (key, value) in raw.hashes {
            let digits = key.strip_prefix("0x").unwrap_or(&key);
            let hash = u32::from_str_radix(digits, 16)
                .map_err(|_| TableError::BadHashKey(key.clone()))?;
            hashes.insert(hash, value);
        }

        Ok(Self {
            arrays: raw.arrays.into_iter().collect(),
            hashes,
        })
    }

    /// Token at `index` of a named table, or `""` when either the table or
    /// the index does not exist.
    pub fn token(&self, table: &str, index: i64) -> &str {
        self.arrays
            .get(table)
            .and_then(|tokens| usize::try_from(index).ok().and_then(|i| tokens.get(i)))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Index of `token` in a named table; unknown tokens resolve to the
    /// first entry rather than failing.
    pub fn index(&self, table: &str, token: &str) -> usize {
        self.arrays
            .get(table)
            .and_then(|tokens| tokens.iter().position(|t| t == token))
            .unwrap_or(0)
    }

    /// Known string for `hash`, or a `HASH_<n>` placeholder.
    pub fn recover_hash(&self, hash: u32) -> String {
        match self.hashes.get(&hash) {
            Some(known) => known.clone(),
            None => format!("HASH_{hash}"),
        }
    }
}
