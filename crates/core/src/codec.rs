//! Native field transcoding
//!
//! [`decode`] reads one field out of a record buffer into a [`FieldValue`];
//! [`encode`] writes one back, mutating the buffer in place. All slots are
//! little-endian. Display ranges on descriptors are advisory only: values
//! out of range are transcoded as-is, never clamped.
//!
//! Lossy encodings round-trip only up to their quantization: the decibel
//! forms round the display value to two decimals, cents snap to whole
//! cents, normalized bytes to 1/255, distances to 2-unit steps.

use cadence_memory::{MemoryError, MemorySource};
use thiserror::Error;

use crate::schema::{Encoding, FieldDescriptor};
use crate::tables::LookupTables;
use crate::value::FieldValue;

/// Display value a zero cents slot decodes to, and below which a cents
/// value encodes back to a zero slot. Keeps the pitch logarithm away from
/// zero without inventing a mid-range value for it.
pub const CENTS_SILENCE: f64 = -18000.0;

/// Errors from transcoding a field
#[derive(Debug, Error)]
pub enum CodecError {
    /// String fields are pointer-indirected; there is nothing sensible to
    /// write through the pointer, so they have no encode path.
    #[error("text fields cannot be written back")]
    TextNotWritable,

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Decode one field from `raw`. Pointer-indirected strings are chased
/// through `strings`; token and hash fields resolve through `tables`.
pub fn decode<S: MemorySource>(
    field: &FieldDescriptor,
    raw: &[u8],
    tables: &LookupTables,
    strings: &S,
) -> Result<FieldValue, CodecError> {
    let o = field.offset as usize;

    let value = match field.encoding {
        Encoding::Text => {
            let ptr = read_u64(raw, o);
            if ptr == 0 {
                FieldValue::Text(String::new())
            } else {
                FieldValue::Text(strings.read_string(ptr)?)
            }
        }
        Encoding::Float32 => FieldValue::Number(read_f32(raw, o) as f64),
        Encoding::UInt32 => FieldValue::Number(read_u32(raw, o) as f64),
        Encoding::EnumIndex32 { table } | Encoding::FlagIndex32 { table } => {
            let index = read_u32(raw, o) as i32;
            FieldValue::Text(tables.token(table, index as i64).to_string())
        }
        Encoding::DbSplU16 => {
            FieldValue::Number(from_dbspl(read_u16(raw, o) as f64 / 65535.0))
        }
        Encoding::DbSplF32 => FieldValue::Number(from_dbspl(read_f32(raw, o) as f64)),
        Encoding::Cents16 => FieldValue::Number(cents_from_raw(read_u16(raw, o))),
        Encoding::Hash32 => FieldValue::Text(tables.recover_hash(read_u32(raw, o))),
        Encoding::BitEnum {
            table,
            width,
            shift,
        }
        | Encoding::BitFlag {
            table,
            width,
            shift,
        } => {
            let word = read_u32(raw, o);
            let index = (word >> shift) & bit_mask(width);
            FieldValue::Text(tables.token(table, index as i64).to_string())
        }
        Encoding::UInt8 => FieldValue::Number(raw[o] as f64),
        Encoding::EnumByte { table } => {
            FieldValue::Text(tables.token(table, raw[o] as i64).to_string())
        }
        Encoding::Int16 => FieldValue::Number(read_i16(raw, o) as f64),
        Encoding::UInt16 => FieldValue::Number(read_u16(raw, o) as f64),
        Encoding::NormByte => FieldValue::Number(raw[o] as f64 / 255.0),
        Encoding::Distance16 => FieldValue::Number(read_u16(raw, o) as f64 * 2.0),
    };

    Ok(value)
}

/// Encode one field into `raw`. Unset values are left alone; bit-packed
/// fields replace only their own window of the shared word.
pub fn encode(
    field: &FieldDescriptor,
    value: &FieldValue,
    tables: &LookupTables,
    raw: &mut [u8],
) -> Result<(), CodecError> {
    if value.is_unset() {
        return Ok(());
    }

    let o = field.offset as usize;

    match field.encoding {
        Encoding::Text => return Err(CodecError::TextNotWritable),
        Encoding::Float32 => write_f32(raw, o, value.number_or_zero() as f32),
        Encoding::UInt32 => write_u32(raw, o, value.number_or_zero().round() as u32),
        Encoding::EnumIndex32 { table } | Encoding::FlagIndex32 { table } => {
            write_u32(raw, o, tables.index(table, value.text_or_empty()) as u32);
        }
        Encoding::DbSplU16 => {
            write_u16(raw, o, (to_dbspl(value.number_or_zero()) * 65535.0).round() as u16);
        }
        Encoding::DbSplF32 => write_f32(raw, o, to_dbspl(value.number_or_zero()) as f32),
        Encoding::Cents16 => write_u16(raw, o, cents_to_raw(value.number_or_zero())),
        Encoding::Hash32 => write_u32(raw, o, hash_string(value.text_or_empty())),
        Encoding::BitEnum {
            table,
            width,
            shift,
        }
        | Encoding::BitFlag {
            table,
            width,
            shift,
        } => {
            let index = tables.index(table, value.text_or_empty()) as u32;
            let mask = bit_mask(width);
            let word = (read_u32(raw, o) & !(mask << shift)) | ((index & mask) << shift);
            write_u32(raw, o, word);
        }
        Encoding::UInt8 => raw[o] = value.number_or_zero().round() as u8,
        Encoding::EnumByte { table } => {
            raw[o] = tables.index(table, value.text_or_empty()) as u8;
        }
        Encoding::Int16 => write_i16(raw, o, value.number_or_zero().round() as i16),
        Encoding::UInt16 => write_u16(raw, o, value.number_or_zero().round() as u16),
        Encoding::NormByte => raw[o] = (value.number_or_zero() * 255.0).round() as u8,
        Encoding::Distance16 => {
            write_u16(raw, o, (value.number_or_zero() / 2.0).round() as u16);
        }
    }

    Ok(())
}

/// 32-bit fingerprint of a string.
///
/// `HASH_` followed by digits passes the digits through as the raw value,
/// so placeholders from [`LookupTables::recover_hash`] survive a round
/// trip. Everything else runs the native recurrence with unsigned
/// wraparound.
pub fn hash_string(value: &str) -> u32 {
    if let Some(rest) = value.strip_prefix("HASH_") {
        if let Ok(raw) = rest.parse::<u32>() {
            return raw;
        }
    }

    let mut hash: u32 = 5381;
    for &byte in value.as_bytes() {
        hash = (byte as u32)
            .wrapping_add(hash << 6)
            .wrapping_add(hash << 16)
            .wrapping_sub(hash);
    }
    hash
}

fn bit_mask(width: u32) -> u32 {
    (1u32 << width) - 1
}

/// Linear amplitude to the two-decimal decibel display value.
fn from_dbspl(linear: f64) -> f64 {
    if linear > 0.0 {
        round2(linear.log10() / 0.05 + 100.0)
    } else {
        0.0
    }
}

/// Decibel display value back to linear amplitude.
fn to_dbspl(display: f64) -> f64 {
    if display > 0.0 {
        10f64.powf((display - 100.0) * 0.05)
    } else {
        0.0
    }
}

fn cents_from_raw(raw: u16) -> f64 {
    if raw == 0 {
        return CENTS_SILENCE;
    }
    ((raw as f64 / 32767.0).log2() * 1200.0).ceil()
}

fn cents_to_raw(cents: f64) -> u16 {
    if cents <= CENTS_SILENCE {
        return 0;
    }
    (2f64.powf(cents / 1200.0) * 32767.0).round() as u16
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn read_u16(raw: &[u8], o: usize) -> u16 {
    u16::from_le_bytes([raw[o], raw[o + 1]])
}

fn read_i16(raw: &[u8], o: usize) -> i16 {
    i16::from_le_bytes([raw[o], raw[o + 1]])
}

fn read_u32(raw: &[u8], o: usize) -> u32 {
    u32::from_le_bytes([raw[o], raw[o + 1], raw[o + 2], raw[o + 3]])
}

fn read_u64(raw: &[u8], o: usize) -> u64 {
    u64::from_le_bytes([
        raw[o],
        raw[o + 1],
        raw[o + 2],
        raw[o + 3],
        raw[o + 4],
        raw[o + 5],
        raw[o + 6],
        raw[o + 7],
    ])
}

fn read_f32(raw: &[u8], o: usize) -> f32 {
    f32::from_le_bytes([raw[o], raw[o + 1], raw[o + 2], raw[o + 3]])
}

fn write_u16(raw: &mut [u8], o: usize, v: u16) {
    raw[o..o + 2].copy_from_slice(&v.to_le_bytes());
}

fn write_i16(raw: &mut [u8], o: usize, v: i16) {
    raw[o..o + 2].copy_from_slice(&v.to_le_bytes());
}

fn write_u32(raw: &mut [u8], o: usize, v: u32) {
    raw[o..o + 4].copy_from_slice(&v.to_le_bytes());
}

fn write_f32(raw: &mut [u8], o: usize, v: f32) {
    raw[o..o + 4].copy_from_slice(&v.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{descriptor, Encoding, FieldDescriptor};
    use cadence_memory::BufferSource;
    use cadence_sdk::ALIAS_RECORD_SIZE;

    fn tables() -> LookupTables {
        LookupTables::builtin().unwrap()
    }

    fn empty_source() -> BufferSource {
        BufferSource::new(0, Vec::new())
    }

    fn field(offset: i32, encoding: Encoding) -> FieldDescriptor {
        FieldDescriptor {
            name: "test",
            offset,
            encoding,
            editable: true,
            range: None,
        }
    }

    fn round_trip(encoding: Encoding, value: FieldValue) -> FieldValue {
        let tables = tables();
        let desc = field(8, encoding);
        let mut raw = [0u8; ALIAS_RECORD_SIZE];
        encode(&desc, &value, &tables, &mut raw).unwrap();
        decode(&desc, &raw, &tables, &empty_source()).unwrap()
    }

    #[test]
    fn plain_numeric_kinds_are_exact() {
        for v in [0.0, 1.0, 255.0, 65535.0, 4294967295.0] {
            assert_eq!(
                round_trip(Encoding::UInt32, FieldValue::Number(v)),
                FieldValue::Number(v)
            );
        }
        for v in [-32768.0, -1.0, 0.0, 32767.0] {
            assert_eq!(
                round_trip(Encoding::Int16, FieldValue::Number(v)),
                FieldValue::Number(v)
            );
        }
        for v in [0.0, 1.0, 65535.0] {
            assert_eq!(
                round_trip(Encoding::UInt16, FieldValue::Number(v)),
                FieldValue::Number(v)
            );
        }
        for v in [0.0, 128.0, 255.0] {
            assert_eq!(
                round_trip(Encoding::UInt8, FieldValue::Number(v)),
                FieldValue::Number(v)
            );
        }
        assert_eq!(
            round_trip(Encoding::Float32, FieldValue::Number(1.5)),
            FieldValue::Number(1.5)
        );
    }

    #[test]
    fn enum_kinds_round_trip_valid_tokens() {
        assert_eq!(
            round_trip(
                Encoding::EnumIndex32 { table: "Storage" },
                FieldValue::Text("streamed".into())
            ),
            FieldValue::Text("streamed".into())
        );
        assert_eq!(
            round_trip(
                Encoding::EnumByte { table: "Bus" },
                FieldValue::Text("BUS_MUSIC".into())
            ),
            FieldValue::Text("BUS_MUSIC".into())
        );
    }

    #[test]
    fn unknown_enum_token_becomes_first_entry() {
        assert_eq!(
            round_trip(
                Encoding::EnumByte { table: "Bus" },
                FieldValue::Text("NOT_A_BUS".into())
            ),
            FieldValue::Text("BUS_FX".into())
        );
    }

    #[test]
    fn dbspl_f32_round_trips_within_hundredths() {
        for v in [1.0, 25.0, 50.0, 94.0, 99.5, 100.0] {
            let FieldValue::Number(back) = round_trip(Encoding::DbSplF32, FieldValue::Number(v))
            else {
                panic!("expected number");
            };
            assert!((back - v).abs() <= 0.01, "{v} came back as {back}");
        }
        // non-positive display values pin the slot to zero
        assert_eq!(
            round_trip(Encoding::DbSplF32, FieldValue::Number(0.0)),
            FieldValue::Number(0.0)
        );
    }

    #[test]
    fn dbspl_u16_round_trips_within_hundredths() {
        // u16 quantization is coarse at low amplitudes; the upper display
        // range is where the two-decimal contract holds
        for v in [60.0, 80.0, 94.0, 100.0] {
            let FieldValue::Number(back) = round_trip(Encoding::DbSplU16, FieldValue::Number(v))
            else {
                panic!("expected number");
            };
            assert!((back - v).abs() <= 0.01, "{v} came back as {back}");
        }
    }

    #[test]
    fn cents_round_trips_within_one_cent() {
        for v in [-2400.0, -1200.0, -100.0, 0.0, 100.0, 1200.0] {
            let FieldValue::Number(back) = round_trip(Encoding::Cents16, FieldValue::Number(v))
            else {
                panic!("expected number");
            };
            assert!((back - v).abs() <= 1.0, "{v} came back as {back}");
        }
    }

    #[test]
    fn cents_zero_slot_is_the_silence_sentinel() {
        let tables = tables();
        let desc = field(8, Encoding::Cents16);
        let raw = [0u8; ALIAS_RECORD_SIZE];
        assert_eq!(
            decode(&desc, &raw, &tables, &empty_source()).unwrap(),
            FieldValue::Number(CENTS_SILENCE)
        );

        let mut out = [0xFFu8; ALIAS_RECORD_SIZE];
        encode(&desc, &FieldValue::Number(CENTS_SILENCE), &tables, &mut out).unwrap();
        assert_eq!(out[8], 0);
        assert_eq!(out[9], 0);
    }

    #[test]
    fn norm_byte_round_trips_within_one_step() {
        for v in [0.0, 0.25, 0.5, 0.77, 1.0] {
            let FieldValue::Number(back) = round_trip(Encoding::NormByte, FieldValue::Number(v))
            else {
                panic!("expected number");
            };
            assert!((back - v).abs() <= 1.0 / 255.0, "{v} came back as {back}");
        }
    }

    #[test]
    fn distance_round_trips_within_one_step() {
        for v in [0.0, 5.0, 100.0, 131070.0] {
            let FieldValue::Number(back) = round_trip(Encoding::Distance16, FieldValue::Number(v))
            else {
                panic!("expected number");
            };
            assert!((back - v).abs() <= 2.0, "{v} came back as {back}");
        }
    }

    #[test]
    fn bit_packing_round_trips_and_preserves_siblings() {
        // a 256-entry table so every index of an 8-bit window has a token
        let tokens: Vec<String> = (0..256).map(|i| format!("\"t{i}\"")).collect();
        let json = format!(r#"{{"arrays":{{"T":[{}]}},"hashes":{{}}}}"#, tokens.join(","));
        let tables = LookupTables::from_json(&json).unwrap();
        let strings = empty_source();

        for width in 1..=8u32 {
            for shift in [0u32, 3, 12, 24, 32 - width] {
                let desc = field(
                    12,
                    Encoding::BitEnum {
                        table: "T",
                        width,
                        shift,
                    },
                );
                for index in 0..(1u32 << width) {
                    let mut raw = [0u8; ALIAS_RECORD_SIZE];
                    // sibling bits set everywhere
                    raw[12..16].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());

                    let token = FieldValue::Text(format!("t{index}"));
                    encode(&desc, &token, &tables, &mut raw).unwrap();

                    let word = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]);
                    let mask = (1u32 << width) - 1;
                    assert_eq!((word >> shift) & mask, index);
                    assert_eq!(word | (mask << shift), u32::MAX, "siblings disturbed");

                    assert_eq!(
                        decode(&desc, &raw, &tables, &strings).unwrap(),
                        token,
                        "w={width} s={shift} i={index}"
                    );
                }
            }
        }
    }

    #[test]
    fn shared_word_fields_do_not_clobber_each_other() {
        let tables = tables();
        let looping = descriptor("Looping").unwrap();
        let storage = descriptor("Storage").unwrap();
        let strings = empty_source();
        let mut raw = [0u8; ALIAS_RECORD_SIZE];

        encode(looping, &FieldValue::Text("looping".into()), &tables, &mut raw).unwrap();
        encode(storage, &FieldValue::Text("streamed".into()), &tables, &mut raw).unwrap();

        assert_eq!(
            decode(looping, &raw, &tables, &strings).unwrap(),
            FieldValue::Text("looping".into())
        );
        assert_eq!(
            decode(storage, &raw, &tables, &strings).unwrap(),
            FieldValue::Text("streamed".into())
        );
    }

    #[test]
    fn hash_golden_values() {
        assert_eq!(hash_string("default"), 0xF680CFBC);
        assert_eq!(hash_string("wet"), 0x32C00D01);
        assert_eq!(hash_string("silent"), 0x59542E3A);
    }

    #[test]
    fn hash_placeholder_passes_raw_value_through() {
        assert_eq!(hash_string("HASH_305441741"), 305441741);
        // non-numeric tails fall back to the recurrence
        assert_ne!(hash_string("HASH_notdigits"), 0);
    }

    #[test]
    fn hash_decode_encode_round_trip() {
        let tables = tables();
        let desc = field(8, Encoding::Hash32);
        let mut raw = [0u8; ALIAS_RECORD_SIZE];
        raw[8..12].copy_from_slice(&305441741u32.to_le_bytes());

        let decoded = decode(&desc, &raw, &tables, &empty_source()).unwrap();
        assert_eq!(decoded, FieldValue::Text("HASH_305441741".into()));

        let mut out = [0u8; ALIAS_RECORD_SIZE];
        encode(&desc, &decoded, &tables, &mut out).unwrap();
        assert_eq!(out[8..12], 305441741u32.to_le_bytes());
    }

    #[test]
    fn text_has_no_encode_path() {
        let tables = tables();
        let desc = field(0, Encoding::Text);
        let mut raw = [0u8; ALIAS_RECORD_SIZE];
        let err = encode(&desc, &FieldValue::Text("x".into()), &tables, &mut raw).unwrap_err();
        assert!(matches!(err, CodecError::TextNotWritable));
    }

    #[test]
    fn unset_values_leave_the_buffer_alone() {
        let tables = tables();
        let desc = field(8, Encoding::UInt32);
        let mut raw = [0xABu8; ALIAS_RECORD_SIZE];
        encode(&desc, &FieldValue::Unset, &tables, &mut raw).unwrap();
        assert!(raw.iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn out_of_range_values_are_not_clamped_to_display_range() {
        // display range for FluxTime is 0..65535 but nothing enforces less
        let tables = tables();
        let flux = descriptor("FluxTime").unwrap();
        let mut raw = [0u8; ALIAS_RECORD_SIZE];
        encode(flux, &FieldValue::Number(70000.0), &tables, &mut raw).unwrap();
        // saturating cast, not a clamp to the advisory range
        assert_eq!(read_u16(&raw, flux.offset as usize), u16::MAX);
    }
}
