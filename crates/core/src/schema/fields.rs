//! The alias column table
//!
//! Offsets, bit windows and enum table names mirror the native record
//! layout of the shipping game build. Word 104 and word 108 each pack many
//! single- and multi-bit fields; hash columns sit in the context block; the
//! tail of the record is bytes and shorts.

use super::{Encoding, FieldDescriptor, VIRTUAL_OFFSET};

const fn text(name: &'static str, offset: i32) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::Text,
        editable: false,
        range: None,
    }
}

const fn hash(name: &'static str, offset: i32) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::Hash32,
        editable: false,
        range: None,
    }
}

const fn bit_enum(
    name: &'static str,
    offset: i32,
    table: &'static str,
    width: u32,
    shift: u32,
) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::BitEnum {
            table,
            width,
            shift,
        },
        editable: true,
        range: None,
    }
}

const fn dbspl(name: &'static str, offset: i32) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::DbSplF32,
        editable: true,
        range: Some((0.0, 100.0)),
    }
}

const fn uint16(name: &'static str, offset: i32, min: f64, max: f64) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::UInt16,
        editable: true,
        range: Some((min, max)),
    }
}

const fn cents(name: &'static str, offset: i32) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::Cents16,
        editable: true,
        range: Some((-2400.0, 1200.0)),
    }
}

const fn distance(name: &'static str, offset: i32) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::Distance16,
        editable: true,
        range: Some((0.0, 131070.0)),
    }
}

const fn int16(name: &'static str, offset: i32, min: f64, max: f64) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::Int16,
        editable: true,
        range: Some((min, max)),
    }
}

const fn norm(name: &'static str, offset: i32) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::NormByte,
        editable: true,
        range: Some((0.0, 1.0)),
    }
}

const fn byte(name: &'static str, offset: i32) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::UInt8,
        editable: true,
        range: Some((0.0, 128.0)),
    }
}

const fn enum_byte(name: &'static str, offset: i32, table: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        name,
        offset,
        encoding: Encoding::EnumByte { table },
        editable: true,
        range: None,
    }
}

/// Every alias column, in record order.
pub static FIELDS: &[FieldDescriptor] = &[
    text("Name", 0),
    text("Subtitle", 16),
    text("Secondary", 24),
    text("StopAlias", 40),
    // flags word at 104
    bit_enum("Looping", 104, "Looping", 1, 0),
    bit_enum("PanType", 104, "PanType", 1, 1),
    bit_enum("SilentInCPZ", 104, "Bool", 1, 2),
    bit_enum("ContextFailsafe", 104, "Bool", 1, 3),
    bit_enum("DistanceLpf", 104, "Bool", 1, 4),
    bit_enum("Doppler", 104, "Bool", 1, 5),
    bit_enum("Pauseable", 104, "Bool", 1, 6),
    bit_enum("IsMusic", 104, "Bool", 1, 7),
    bit_enum("StopOnEntDeath", 104, "Bool", 1, 8),
    bit_enum("Timescale", 104, "Bool", 1, 9),
    bit_enum("VoiceLimit", 104, "Bool", 1, 10),
    bit_enum("IgnoreMaxDist", 104, "Bool", 1, 11),
    bit_enum("Storage", 104, "Storage", 2, 12),
    bit_enum("FluxType", 104, "FluxType", 4, 14),
    bit_enum("LimitType", 104, "LimitType", 2, 18),
    bit_enum("EntityLimitType", 104, "LimitType", 2, 20),
    bit_enum("RandomizeType", 104, "RandomizeType", 3, 22),
    bit_enum("IsCinematic", 104, "Bool", 1, 27),
    bit_enum("IsBig", 104, "Bool", 1, 28),
    bit_enum("AmplitudePriority", 104, "Bool", 1, 28),
    bit_enum("ContinuousPan", 104, "Bool", 1, 30),
    bit_enum("RestartContextLoops", 104, "Bool", 1, 31),
    // curves word at 108
    bit_enum("NeverPlayTwice", 108, "Bool", 1, 0),
    bit_enum("DryMaxCurve", 108, "Curve", 6, 2),
    bit_enum("WetMaxCurve", 108, "Curve", 6, 8),
    bit_enum("DryMinCurve", 108, "Curve", 6, 14),
    bit_enum("WetMinCurve", 108, "Curve", 6, 20),
    // context block
    hash("Duck", 112),
    hash("ContextType", 116),
    hash("ContextValue", 120),
    hash("ContextType1", 124),
    hash("ContextValue1", 128),
    hash("ContextType2", 132),
    hash("ContextValu2", 136),
    hash("ContextType3", 140),
    hash("ContextValue3", 144),
    hash("StopOnPlay", 148),
    hash("FutzPatch", 152),
    // sends and volumes
    dbspl("ReverbSend", 156),
    dbspl("CenterSend", 160),
    dbspl("VolMin", 164),
    dbspl("VolMax", 168),
    dbspl("EnvelopPercent", 172),
    uint16("FluxTime", 176, 0.0, 65535.0),
    uint16("StartDelay", 178, 0.0, 65535.0),
    cents("PitchMin", 180),
    cents("PitchMax", 182),
    distance("DistMin", 184),
    distance("DistMaxDry", 186),
    distance("DistMaxWet", 188),
    distance("EnvelopMin", 190),
    distance("EnvelopMax", 192),
    int16("FadeIn", 202, 0.0, 32768.0),
    int16("FadeOut", 202, 0.0, 32768.0),
    int16("DopplerScale", 202, -100.0, 100.0),
    norm("PriorityThresholdMin", 204),
    norm("PriorityThresholdMax", 205),
    norm("Probability", 206),
    byte("PriorityMin", 208),
    byte("PriorityMax", 209),
    enum_byte("Pan", 210, "Pan"),
    byte("LimitCount", 211),
    byte("EntityLimitCount", 212),
    enum_byte("DuckGroup", 213, "DuckGroup"),
    enum_byte("Bus", 214, "Bus"),
    enum_byte("VolumeGroup", 215, "VolumeGroup"),
    // template-only
    FieldDescriptor {
        name: "Template",
        offset: VIRTUAL_OFFSET,
        encoding: Encoding::Text,
        editable: false,
        range: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_sdk::ALIAS_RECORD_SIZE;

    #[test]
    fn backed_fields_fit_the_record() {
        for field in FIELDS {
            if !field.backed() {
                continue;
            }
            let width = match field.encoding {
                Encoding::Text => 8,
                Encoding::Float32
                | Encoding::UInt32
                | Encoding::EnumIndex32 { .. }
                | Encoding::FlagIndex32 { .. }
                | Encoding::Hash32
                | Encoding::BitEnum { .. }
                | Encoding::BitFlag { .. } => 4,
                Encoding::DbSplF32 => 4,
                Encoding::DbSplU16
                | Encoding::Cents16
                | Encoding::Int16
                | Encoding::UInt16
                | Encoding::Distance16 => 2,
                Encoding::UInt8 | Encoding::EnumByte { .. } | Encoding::NormByte => 1,
            };
            assert!(
                field.offset as usize + width <= ALIAS_RECORD_SIZE,
                "{} overruns the record",
                field.name
            );
        }
    }

    #[test]
    fn bit_windows_stay_inside_their_word() {
        for field in FIELDS {
            if let Encoding::BitEnum { width, shift, .. } | Encoding::BitFlag { width, shift, .. } =
                field.encoding
            {
                assert!(width >= 1 && shift + width <= 32, "{}", field.name);
            }
        }
    }
}
