//! Alias banks
//!
//! A bank is a named collection of records keyed by alias name. Each name
//! maps to an ordered sequence of variant records; the order records were
//! first appended in is load-bearing, because override pairs a live
//! sequence with a source sequence positionally. Every bank owns its own
//! lookup tables.

use std::collections::HashMap;

use cadence_memory::{MemoryError, MemorySource};
use cadence_sdk::{AliasTableEntry, ALIAS_RECORD_SIZE};

use crate::record::{Record, RecordError};
use crate::tables::LookupTables;

/// A named, order-preserving collection of alias records.
#[derive(Debug, Clone)]
pub struct Bank {
    name: String,
    records: HashMap<String, Vec<Record>>,
    tables: LookupTables,
}

impl Bank {
    pub fn new(name: &str, tables: LookupTables) -> Self {
        Self {
            name: name.to_string(),
            records: HashMap::new(),
            tables,
        }
    }

    /// Build a bank from a live alias table: for each entry, exactly
    /// `variant_count` bound records at 216-byte strides from its variant
    /// base. Records stay undecoded until the override engine needs them.
    pub fn from_live<S: MemorySource>(
        name: &str,
        mem: &S,
        aliases_ptr: u64,
        alias_count: usize,
        tables: LookupTables,
    ) -> Result<Self, MemoryError> {
        let mut bank = Self::new(name, tables);
        let entries: Vec<AliasTableEntry> = mem.read_array(aliases_ptr, alias_count)?;

        for entry in entries {
            let alias_name = mem.read_string(entry.name_ptr as u64)?;
            let list = bank.get_or_add(&alias_name);
            for i in 0..entry.variant_count.max(0) as u64 {
                let address = entry.variants_ptr as u64 + i * ALIAS_RECORD_SIZE as u64;
                list.push(Record::bound(address, &alias_name));
            }
        }

        Ok(bank)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &LookupTables {
        &self.tables
    }

    /// The record sequence for `alias`, created empty on first use.
    pub fn get_or_add(&mut self, alias: &str) -> &mut Vec<Record> {
        self.records.entry(alias.to_string()).or_default()
    }

    pub fn records(&self, alias: &str) -> Option<&[Record]> {
        self.records.get(alias).map(Vec::as_slice)
    }

    pub fn first_record(&self, alias: &str) -> Option<&Record> {
        self.records.get(alias).and_then(|list| list.first())
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.records.contains_key(alias)
    }

    pub fn alias_names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn alias_count(&self) -> usize {
        self.records.len()
    }

    /// Merge `source_rows` over this bank's sequence for `alias` with
    /// clamped pairing: live index `i` takes source row `min(i, s-1)`, so a
    /// short source repeats its last row across the remaining live records.
    /// Each live record is decoded, overwritten, and committed in turn.
    pub fn override_alias<S: MemorySource>(
        &mut self,
        alias: &str,
        source_rows: &[Record],
        mem: &S,
    ) -> Result<usize, RecordError> {
        let Bank {
            records, tables, ..
        } = self;

        let Some(live) = records.get_mut(alias) else {
            return Ok(0);
        };
        if source_rows.is_empty() {
            return Ok(0);
        }

        for (i, record) in live.iter_mut().enumerate() {
            record.decode(mem, tables)?;
            record.copy_from(&source_rows[i.min(source_rows.len() - 1)]);
            record.encode(mem, tables)?;
        }

        Ok(live.len())
    }
}
