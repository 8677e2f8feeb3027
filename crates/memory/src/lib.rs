//! Cadence memory - foreign process access and pattern scanning
//!
//! Everything Cadence knows about another process's address space lives
//! here:
//!
//! - [`MemorySource`] - the read/write abstraction the rest of the tool is
//!   written against, so the same code runs against a live process or a
//!   flat byte image
//! - [`ForeignProcess`] - live attachment over `process_vm_readv`/`writev`
//! - [`BufferSource`] - an in-memory image, used by tests and dump analysis
//! - [`pattern`] - masked byte signature parsing and scanning

pub mod pattern;
pub mod process;
pub mod source;

pub use pattern::{parse_signature, resolve_rel32, scan, scan_source, Pattern, PatternError};
pub use process::{ForeignProcess, ModuleInfo};
pub use source::{BufferSource, MemoryError, MemorySource};
