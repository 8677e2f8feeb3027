//! Cadence - live sound alias patching for Black Ops III
//!
//! This crate turns CSV alias definitions into the game's native binary
//! records and writes them into a running, modded game. The pieces:
//!
//! - [`schema`] - the static table mapping alias columns onto the native
//!   record's bytes and bits
//! - [`codec`] - per-encoding decode/encode, including the logarithmic and
//!   bit-packed forms
//! - [`tables`] - enum token arrays and hash recovery, owned per bank
//! - [`record`] / [`bank`] - bound and unbound alias records, grouped by
//!   name with load-bearing order
//! - [`tabular`] - the CSV-ish input format
//! - [`session`] - anchor discovery and the parse/match/override pipeline
//! - [`watch`] - filesystem watching and the serialized reload driver
//! - [`config`] - the TOML config file

pub mod bank;
pub mod codec;
pub mod config;
pub mod record;
pub mod schema;
pub mod session;
pub mod tables;
pub mod tabular;
pub mod value;
pub mod watch;

// Re-export commonly used items
pub use bank::Bank;
pub use codec::{hash_string, CodecError};
pub use config::{default_config_path, CadenceConfig, ConfigError, ConfigResult};
pub use record::{Binding, Record, RecordError};
pub use schema::{descriptor, Encoding, FieldDescriptor, FIELDS};
pub use session::{Session, SessionError, SoundPaths};
pub use tables::{LookupTables, TableError};
pub use value::FieldValue;
pub use watch::{WatchError, WatchEvent};
