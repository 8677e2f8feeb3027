//! The patch session
//!
//! A session owns everything one attached game needs: the memory source,
//! the live banks discovered at startup, the lookup tables, the mod-name
//! anchor, and the sound folder paths. The reload pipeline - parse
//! templates, parse aliases, override live banks - is a method of this
//! value; there is no ambient global state.
//!
//! Startup locates two byte signatures in the game module. One sits inside
//! the code that indexes the asset pool directory; the other inside the
//! accessor for the loaded mod's name. In both cases the interesting
//! address is recovered by adding a 32-bit displacement found at a fixed
//! spot in the match to the address just past it - the scanner itself never
//! interprets instructions beyond that.

use std::mem::size_of;
use std::path::{Path, PathBuf};

use cadence_memory::{
    parse_signature, resolve_rel32, scan_source, MemoryError, MemorySource, PatternError,
};
use cadence_sdk::{AssetPool, SoundBankHeader, ASSET_POOL_COUNT, SOUND_BANK_POOL};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bank::Bank;
use crate::record::{Record, RecordError};
use crate::tables::{LookupTables, TableError};
use crate::tabular::{self, TabularFile};

/// Signature inside the pool directory indexing code; the directory's
/// displacement sits at +5, relative to +9.
const POOL_DIRECTORY_SIG: &str = "63 C1 48 8D 05 ? ? ? ? 49 C1 E0 ? 4C 03 C0";

/// Signature near the call to the mod-name accessor; the call displacement
/// sits at +20 relative to +24, and the accessor loads the name address via
/// a displacement at +3 relative to +7.
const MOD_NAME_SIG: &str = "00 E8 ? ? ? FF 84 C0 74 4F E8 ? ? ? FF 84";

/// Errors that end a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("required byte signature not found in the game module")]
    SignatureNotFound,

    #[error("no mod is currently loaded in the game")]
    NoModLoaded,

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Where alias and template definitions live on disk.
#[derive(Debug, Clone)]
pub struct SoundPaths {
    pub templates: PathBuf,
    pub aliases: PathBuf,
}

impl SoundPaths {
    /// The conventional layout under the sound data root.
    pub fn under(sound_root: &Path) -> Self {
        Self {
            templates: sound_root.join("templates"),
            aliases: sound_root.join("aliases"),
        }
    }
}

/// One attached game plus everything needed to re-apply alias edits.
#[derive(Debug)]
pub struct Session<S: MemorySource> {
    mem: S,
    banks: Vec<Bank>,
    tables: LookupTables,
    mod_name_addr: u64,
    paths: SoundPaths,
    allow_list: Vec<String>,
}

impl<S: MemorySource> Session<S> {
    /// Scan the module for the two required anchors, verify a mod is
    /// loaded, and walk the sound bank pool into live banks.
    ///
    /// `allow_list` holds lowercased base names of alias files to apply;
    /// empty applies all of them.
    pub fn discover(
        mem: S,
        module_base: u64,
        module_end: u64,
        paths: SoundPaths,
        allow_list: Vec<String>,
    ) -> Result<Self, SessionError> {
        let tables = LookupTables::builtin()?;

        let pool_sig = parse_signature(POOL_DIRECTORY_SIG)?;
        let name_sig = parse_signature(MOD_NAME_SIG)?;

        let pool_hits = scan_source(&mem, module_base, module_end, &pool_sig, true);
        let name_hits = scan_source(&mem, module_base, module_end, &name_sig, true);
        let (Some(&pool_at), Some(&name_at)) = (pool_hits.first(), name_hits.first()) else {
            return Err(SessionError::SignatureNotFound);
        };

        let accessor = resolve_rel32(&mem, name_at + 20, name_at + 24)?;
        let mod_name_addr = resolve_rel32(&mem, accessor + 3, accessor + 7)?;

        // Patching alias memory without a mod loaded pokes at the stock
        // game, which is exactly what this tool must never do.
        let mod_name = mem.read_string(mod_name_addr)?;
        if mod_name.trim().is_empty() {
            return Err(SessionError::NoModLoaded);
        }
        info!("loaded mod: {mod_name}");

        let pools_addr = resolve_rel32(&mem, pool_at + 5, pool_at + 9)?;
        let pools: Vec<AssetPool> = mem.read_array(pools_addr, ASSET_POOL_COUNT)?;
        let sound_pool = pools[SOUND_BANK_POOL];
        debug!(
            "sound bank pool at {:#x}, {} entries",
            sound_pool.pool_ptr, sound_pool.count
        );

        let mut banks = Vec::new();
        let stride = size_of::<SoundBankHeader>() as u64;
        for i in 0..sound_pool.count.max(0) as u64 {
            let header: SoundBankHeader =
                mem.read_value(sound_pool.pool_ptr as u64 + i * stride)?;
            if !header.has_aliases() {
                continue;
            }
            let bank_name = mem.read_string(header.name_ptr as u64)?;
            banks.push(Bank::from_live(
                &bank_name,
                &mem,
                header.aliases_ptr as u64,
                header.alias_count.max(0) as usize,
                tables.clone(),
            )?);
        }
        info!("parsed {} sound banks from the game", banks.len());

        Ok(Self {
            mem,
            banks,
            tables,
            mod_name_addr,
            paths,
            allow_list,
        })
    }

    pub fn banks(&self) -> &[Bank] {
        &self.banks
    }

    pub fn tables(&self) -> &LookupTables {
        &self.tables
    }

    pub fn paths(&self) -> &SoundPaths {
        &self.paths
    }

    /// Whether the game still has a mod loaded, as ordinary control flow.
    pub fn mod_loaded(&self) -> Result<bool, MemoryError> {
        Ok(!self.mem.read_string(self.mod_name_addr)?.trim().is_empty())
    }

    /// Parse the template bank. Rows template-fill against whatever has
    /// already been registered, so ordering within and across files
    /// matters and forward references stay unresolved. Files that fail to
    /// parse are tolerated without a diagnostic.
    pub fn parse_templates(&self) -> Bank {
        let mut bank = Bank::new("templates", self.tables.clone());

        for file in tabular::find_tabular_files(&self.paths.templates) {
            debug!("parsing {}", file.display());
            let Ok(parsed) = tabular::load_file(&file) else {
                continue;
            };
            absorb_rows(&mut bank, &parsed, None);
        }

        bank
    }

    /// Parse the source bank against a finished template bank, honoring
    /// the allow-list. Here parse failures are the operator's business:
    /// logged, the file skipped, the rest continue.
    pub fn parse_aliases(&self, templates: &Bank) -> Bank {
        let mut bank = Bank::new("source", self.tables.clone());

        for file in tabular::find_tabular_files(&self.paths.aliases) {
            if !self.alias_file_allowed(&file) {
                continue;
            }
            info!("parsing {}", file.display());
            match tabular::load_file(&file) {
                Ok(parsed) => absorb_rows(&mut bank, &parsed, Some(templates)),
                Err(err) => warn!("parse error: {err}"),
            }
        }

        bank
    }

    fn alias_file_allowed(&self, path: &Path) -> bool {
        if self.allow_list.is_empty() {
            return true;
        }
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.allow_list.iter().any(|allowed| *allowed == stem)
    }

    /// Apply a source bank to the live banks. First live bank containing
    /// an alias wins; a name found nowhere is reported and dropped for
    /// this run; a count mismatch warns but still merges clamped.
    pub fn override_aliases(&mut self, source: &Bank) -> Result<(), SessionError> {
        for alias in source.alias_names() {
            let Some(rows) = source.records(alias) else {
                continue;
            };

            let mut found = false;
            for bank in &mut self.banks {
                if !bank.contains(alias) {
                    continue;
                }
                found = true;
                info!("overriding {alias}");

                let live_len = bank.records(alias).map(<[Record]>::len).unwrap_or(0);
                if live_len != rows.len() {
                    warn!(
                        "entry count mismatch for {alias}: in-game {live_len}, source {}",
                        rows.len()
                    );
                }

                bank.override_alias(alias, rows, &self.mem)?;
                break;
            }

            if !found {
                warn!("failed to find {alias} in any loaded bank");
            }
        }

        Ok(())
    }

    /// The full pipeline: re-check the mod, re-parse everything, override.
    /// Running it twice with unchanged input reproduces the same live
    /// state; nothing is tracked across runs.
    pub fn reload(&mut self) -> Result<(), SessionError> {
        if !self.mod_loaded()? {
            return Err(SessionError::NoModLoaded);
        }

        let templates = self.parse_templates();
        let source = self.parse_aliases(&templates);
        self.override_aliases(&source)
    }
}

/// Turn parsed rows into records of `bank`. With `templates` given, rows
/// fill from that bank; otherwise they fill from `bank` itself as built so
/// far. Rows without a name are dropped.
fn absorb_rows(bank: &mut Bank, parsed: &TabularFile, templates: Option<&Bank>) {
    for row in &parsed.rows {
        let mut record = Record::from_row(&parsed.header, row);
        match templates {
            Some(templates) => record.apply_template(templates),
            None => record.apply_template(bank),
        }

        let name = record.name().to_string();
        if name.trim().is_empty() {
            continue;
        }
        bank.get_or_add(&name).push(record);
    }
}
