//! Alias field schema
//!
//! One fixed, process-wide table describes how every named alias column maps
//! onto the 216-byte native record: byte offset, transcoding rule, bit
//! position for packed fields, enum table for token fields, and whether the
//! field may be written back. The table is an explicit static array - the
//! CSV parser looks descriptors up by column name, the codec dispatches on
//! the encoding.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::value::FieldValue;

mod fields;

pub use fields::FIELDS;

/// Offset marking a virtual field that exists only in tabular input.
pub const VIRTUAL_OFFSET: i32 = -1;

/// Column carrying the alias name.
pub const NAME_FIELD: &str = "Name";

/// Virtual column naming the template record to inherit defaults from.
pub const TEMPLATE_FIELD: &str = "Template";

/// Transcoding rule for one field.
///
/// Bit-packed variants carry their bit window and enum table directly;
/// display ranges live on the descriptor. The two never share storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Pointer-indirected string; decode only
    Text,
    Float32,
    UInt32,
    /// 4-byte enum index resolved through a named table
    EnumIndex32 { table: &'static str },
    /// 4-byte flag index resolved through a named table
    FlagIndex32 { table: &'static str },
    /// Linear amplitude in a u16 slot, displayed as decibels
    DbSplU16,
    /// Linear amplitude in an f32 slot, displayed as decibels
    DbSplF32,
    /// Pitch offset stored as a ratio against 32767
    Cents16,
    /// 32-bit string fingerprint
    Hash32,
    /// Enum index packed into `width` bits at `shift` of a shared u32 word
    BitEnum {
        table: &'static str,
        width: u32,
        shift: u32,
    },
    /// Flag index packed into `width` bits at `shift` of a shared u32 word
    BitFlag {
        table: &'static str,
        width: u32,
        shift: u32,
    },
    UInt8,
    /// 1-byte enum index resolved through a named table
    EnumByte { table: &'static str },
    Int16,
    UInt16,
    /// Byte scaled to [0, 1]
    NormByte,
    /// u16 in 2-unit steps
    Distance16,
}

impl Encoding {
    /// Whether values of this encoding are strings rather than numbers.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Encoding::Text
                | Encoding::EnumIndex32 { .. }
                | Encoding::FlagIndex32 { .. }
                | Encoding::Hash32
                | Encoding::BitEnum { .. }
                | Encoding::BitFlag { .. }
                | Encoding::EnumByte { .. }
        )
    }

    /// Interpret one tabular cell. Numeric cells that fail to parse become
    /// zero rather than an error.
    pub fn parse_cell(&self, cell: &str) -> FieldValue {
        if self.is_textual() {
            FieldValue::Text(cell.to_string())
        } else {
            FieldValue::Number(cell.parse().unwrap_or(0.0))
        }
    }
}

/// Descriptor of one alias column.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// CSV header name
    pub name: &'static str,
    /// Byte offset inside the native record; [`VIRTUAL_OFFSET`] for fields
    /// with no native backing
    pub offset: i32,
    pub encoding: Encoding,
    /// May this field be written back into the game
    pub editable: bool,
    /// Advisory display range; never enforced by the codec
    pub range: Option<(f64, f64)>,
}

impl FieldDescriptor {
    /// Whether the field occupies bytes of the native record.
    pub fn backed(&self) -> bool {
        self.offset >= 0
    }
}

static BY_NAME: LazyLock<HashMap<&'static str, &'static FieldDescriptor>> =
    LazyLock::new(|| FIELDS.iter().map(|field| (field.name, field)).collect());

/// Look up a descriptor by column name.
pub fn descriptor(name: &str) -> Option<&'static FieldDescriptor> {
    BY_NAME.get(name).copied()
}
