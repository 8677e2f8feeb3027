//! One alias record
//!
//! A record is either bound to a live address (created only while walking
//! the game's alias tables) or unbound (created from one tabular row).
//! Bound records decode themselves out of the game, take values from an
//! unbound source via [`Record::copy_from`], and encode back with exactly
//! one whole-buffer write so the game can never observe a half-updated
//! structure. Unbound records never touch memory.

use std::collections::HashMap;

use cadence_memory::{MemoryError, MemorySource};
use cadence_sdk::ALIAS_RECORD_SIZE;
use thiserror::Error;

use crate::bank::Bank;
use crate::codec::{self, CodecError};
use crate::schema::{self, NAME_FIELD, TEMPLATE_FIELD};
use crate::tables::LookupTables;
use crate::value::{FieldValue, UNSET};

/// Where a record's bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Pure tabular input; never written back
    Unbound,
    /// Backed by a native record at this address, fixed at construction
    Bound(u64),
}

/// Errors from decoding or encoding a record
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("cannot decode an unbound record")]
    DecodeUnbound,

    #[error("cannot encode an unbound record")]
    EncodeUnbound,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// One alias variant, bound or unbound.
#[derive(Debug, Clone)]
pub struct Record {
    binding: Binding,
    values: HashMap<&'static str, FieldValue>,
    raw: [u8; ALIAS_RECORD_SIZE],
}

impl Record {
    /// A live record at `address`, named after its alias table entry.
    /// Field values stay empty until [`decode`](Record::decode) runs.
    pub fn bound(address: u64, name: &str) -> Self {
        let mut values = HashMap::new();
        values.insert(NAME_FIELD, FieldValue::Text(name.to_string()));
        Self {
            binding: Binding::Bound(address),
            values,
            raw: [0; ALIAS_RECORD_SIZE],
        }
    }

    /// An unbound record from one tabular row. Blank cells stay unset;
    /// columns that match no registered field are ignored.
    pub fn from_row(header: &[String], cells: &[String]) -> Self {
        let mut values = HashMap::new();

        for (i, cell) in cells.iter().enumerate() {
            if cell.trim().is_empty() {
                continue;
            }
            let Some(column) = header.get(i) else {
                continue;
            };
            if let Some(field) = schema::descriptor(column) {
                values.insert(field.name, field.encoding.parse_cell(cell));
            }
        }

        Self {
            binding: Binding::Unbound,
            values,
            raw: [0; ALIAS_RECORD_SIZE],
        }
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn name(&self) -> &str {
        self.value(NAME_FIELD).text_or_empty()
    }

    /// Name of the record this one inherits defaults from, if any.
    pub fn template_ref(&self) -> Option<&str> {
        match self.value(TEMPLATE_FIELD).as_text() {
            Some(name) if !name.is_empty() => Some(name),
            _ => None,
        }
    }

    /// Current value of a field; missing entries read as unset.
    pub fn value(&self, name: &str) -> &FieldValue {
        self.values.get(name).unwrap_or(&UNSET)
    }

    pub fn set_value(&mut self, field: &'static str, value: FieldValue) {
        self.values.insert(field, value);
    }

    /// Read the native buffer from the bound address and decode every
    /// memory-backed field.
    pub fn decode<S: MemorySource>(
        &mut self,
        mem: &S,
        tables: &LookupTables,
    ) -> Result<(), RecordError> {
        let Binding::Bound(address) = self.binding else {
            return Err(RecordError::DecodeUnbound);
        };

        let bytes = mem.read_bytes(address, ALIAS_RECORD_SIZE)?;
        self.raw.copy_from_slice(&bytes);

        for field in schema::FIELDS {
            if !field.backed() {
                continue;
            }
            let value = codec::decode(field, &self.raw, tables, mem)?;
            self.values.insert(field.name, value);
        }

        Ok(())
    }

    /// Encode every set, editable, memory-backed field into the buffer,
    /// then commit the whole buffer with a single write.
    pub fn encode<S: MemorySource>(
        &mut self,
        mem: &S,
        tables: &LookupTables,
    ) -> Result<(), RecordError> {
        let Binding::Bound(address) = self.binding else {
            return Err(RecordError::EncodeUnbound);
        };

        let Record { values, raw, .. } = self;
        for field in schema::FIELDS {
            if !field.editable || !field.backed() {
                continue;
            }
            let Some(value) = values.get(field.name) else {
                continue;
            };
            codec::encode(field, value, tables, raw)?;
        }

        mem.write_bytes(address, &self.raw)?;
        Ok(())
    }

    /// Take every schema field's value state from `other`, set or unset,
    /// editable or not. Binding and buffer are untouched; `editable` is
    /// honored at encode time instead.
    pub fn copy_from(&mut self, other: &Record) {
        for field in schema::FIELDS {
            match other.values.get(field.name) {
                Some(value) => self.values.insert(field.name, value.clone()),
                None => self.values.remove(field.name),
            };
        }
    }

    /// Fill unset fields from the first template record this one names.
    ///
    /// Already-set fields are never overwritten, and a template that does
    /// not (yet) exist leaves the record as-is.
    pub fn apply_template(&mut self, templates: &Bank) {
        if self.binding != Binding::Unbound {
            return;
        }
        let Some(name) = self.template_ref().map(str::to_owned) else {
            return;
        };
        let Some(template) = templates.first_record(&name) else {
            return;
        };

        for field in schema::FIELDS {
            if !self.value(field.name).is_unset() {
                continue;
            }
            if let Some(value) = template.values.get(field.name) {
                if !value.is_unset() {
                    self.values.insert(field.name, value.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn row_parsing_skips_blanks_and_unknown_columns() {
        let record = Record::from_row(
            &header(&["Name", "VolMin", "Mystery", "Bus"]),
            &header(&["weapon_shot", "", "7", "BUS_MUSIC"]),
        );

        assert_eq!(record.name(), "weapon_shot");
        assert!(record.value("VolMin").is_unset());
        assert_eq!(record.value("Bus"), &FieldValue::Text("BUS_MUSIC".into()));
        assert_eq!(record.binding(), Binding::Unbound);
    }

    #[test]
    fn row_longer_than_header_is_tolerated() {
        let record = Record::from_row(&header(&["Name"]), &header(&["x", "overflow", "more"]));
        assert_eq!(record.name(), "x");
    }

    #[test]
    fn template_fill_only_touches_unset_fields() {
        let tables = LookupTables::builtin().unwrap();
        let mut templates = Bank::new("templates", tables);
        let mut base = Record::from_row(
            &header(&["Name", "VolMin", "VolMax"]),
            &header(&["base", "10", "20"]),
        );
        base.apply_template(&templates);
        templates.get_or_add("base").push(base);

        let mut record = Record::from_row(
            &header(&["Name", "Template", "VolMax"]),
            &header(&["shot", "base", "5"]),
        );
        record.apply_template(&templates);

        assert_eq!(record.value("VolMin"), &FieldValue::Number(10.0));
        assert_eq!(record.value("VolMax"), &FieldValue::Number(5.0));
    }

    #[test]
    fn template_forward_reference_stays_unresolved() {
        let tables = LookupTables::builtin().unwrap();
        let templates = Bank::new("templates", tables);

        let mut record = Record::from_row(
            &header(&["Name", "Template"]),
            &header(&["shot", "not_parsed_yet"]),
        );
        record.apply_template(&templates);
        assert!(record.value("VolMin").is_unset());
    }

    #[test]
    fn copy_from_transfers_unset_state_too() {
        let mut target = Record::from_row(
            &header(&["Name", "VolMin", "VolMax"]),
            &header(&["a", "1", "2"]),
        );
        let source = Record::from_row(&header(&["Name", "VolMin"]), &header(&["b", "9"]));

        target.copy_from(&source);
        assert_eq!(target.name(), "b");
        assert_eq!(target.value("VolMin"), &FieldValue::Number(9.0));
        // VolMax was set on the target but unset on the source
        assert!(target.value("VolMax").is_unset());
    }

    #[test]
    fn unbound_records_refuse_memory_io() {
        let tables = LookupTables::builtin().unwrap();
        let mem = cadence_memory::BufferSource::new(0, vec![0; ALIAS_RECORD_SIZE]);
        let mut record = Record::from_row(&header(&["Name"]), &header(&["x"]));

        assert!(matches!(
            record.decode(&mem, &tables),
            Err(RecordError::DecodeUnbound)
        ));
        assert!(matches!(
            record.encode(&mem, &tables),
            Err(RecordError::EncodeUnbound)
        ));
    }
}
