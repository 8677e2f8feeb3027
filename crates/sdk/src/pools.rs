//! Asset pool directory layout
//!
//! The game keeps one fixed directory of asset pools; each pool is a typed
//! arena of asset headers. Cadence only walks the sound bank pool, but the
//! directory itself has to be read as a whole array.

/// Number of entries in the asset pool directory.
pub const ASSET_POOL_COUNT: usize = 107;

/// Directory index of the sound bank pool.
pub const SOUND_BANK_POOL: usize = 10;

/// One entry of the asset pool directory.
///
/// Matches the in-game layout byte for byte; read with
/// `MemorySource::read_array`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AssetPool {
    /// Base address of the pool's header arena
    pub pool_ptr: i64,
    /// Size of one asset header in this pool
    pub header_size: i32,
    /// Allocated capacity, in headers
    pub capacity: i32,
    pub padding: i32,
    /// Number of live headers
    pub count: i32,
    /// Free-list head
    pub free_head: i64,
}
