//! Cadence SDK - Black Ops III Native Sound Type Definitions
//!
//! This crate contains the native structure layouts Cadence reads out of the
//! game's memory. It has no dependencies and compiles quickly, allowing
//! parallel compilation of dependent crates.
//!
//! # Modules
//!
//! - [`pools`] - Asset pool directory layout
//! - [`bank`] - Sound bank asset header and alias table entry layouts

pub mod bank;
pub mod pools;

pub use bank::{AliasTableEntry, SoundBankHeader, ALIAS_RECORD_SIZE, AMBIENT_BSP_BYTES};
pub use pools::{AssetPool, ASSET_POOL_COUNT, SOUND_BANK_POOL};
