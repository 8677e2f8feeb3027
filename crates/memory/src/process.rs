//! Live process attachment
//!
//! Finds the target process by name under `/proc`, resolves its main module
//! mapping, and implements [`MemorySource`] over
//! `process_vm_readv`/`process_vm_writev`. Both syscalls address the target
//! without stopping it, which is exactly the contract the patcher wants:
//! single reads and writes are atomic, nothing coarser is.

use std::io::{IoSlice, IoSliceMut};
use std::path::{Path, PathBuf};

use nix::sys::uio::{process_vm_readv, process_vm_writev, RemoteIoVec};
use nix::unistd::Pid;
use tracing::{debug, info};

use crate::source::{MemoryError, MemorySource};

/// Main module mapping of an attached process.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Lowest mapped address of the module
    pub base: u64,
    /// Span from `base` to the end of the module's highest mapping
    pub size: u64,
    /// Filesystem path of the module image
    pub path: PathBuf,
}

impl ModuleInfo {
    pub fn end(&self) -> u64 {
        self.base + self.size
    }

    /// Directory containing the module image.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }
}

/// An attached foreign process.
#[derive(Debug)]
pub struct ForeignProcess {
    pid: Pid,
    module: ModuleInfo,
}

impl ForeignProcess {
    /// Attach to the first running process whose command name matches.
    ///
    /// Fails if no such process exists or its main module cannot be
    /// resolved from `/proc/<pid>/maps`.
    pub fn attach(process_name: &str) -> Result<Self, MemoryError> {
        let pid = find_process(process_name)
            .ok_or_else(|| MemoryError::ProcessNotFound(process_name.to_string()))?;
        let module = main_module(pid)?;

        info!(
            "attached to {} (pid {}, base {:#x}, {:#x} bytes)",
            module.path.display(),
            pid.as_raw(),
            module.base,
            module.size
        );

        Ok(Self { pid, module })
    }

    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }
}

impl MemorySource for ForeignProcess {
    fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buf = vec![0u8; len];
        let mut local = [IoSliceMut::new(&mut buf)];
        let remote = [RemoteIoVec {
            base: addr as usize,
            len,
        }];

        let read = process_vm_readv(self.pid, &mut local, &remote).map_err(|errno| {
            MemoryError::Read {
                addr,
                len,
                source: errno.into(),
            }
        })?;

        if read != len {
            return Err(MemoryError::Short {
                op: "read",
                addr,
                expected: len,
                actual: read,
            });
        }

        Ok(buf)
    }

    fn write_bytes(&self, addr: u64, data: &[u8]) -> Result<(), MemoryError> {
        let local = [IoSlice::new(data)];
        let remote = [RemoteIoVec {
            base: addr as usize,
            len: data.len(),
        }];

        let written = process_vm_writev(self.pid, &local, &remote).map_err(|errno| {
            MemoryError::Write {
                addr,
                len: data.len(),
                source: errno.into(),
            }
        })?;

        if written != data.len() {
            return Err(MemoryError::Short {
                op: "write",
                addr,
                expected: data.len(),
                actual: written,
            });
        }

        Ok(())
    }
}

/// Walk `/proc` for a process whose `comm` matches `name`.
///
/// `comm` is truncated to 15 bytes by the kernel, so a long target name is
/// matched by prefix.
fn find_process(name: &str) -> Option<Pid> {
    let entries = std::fs::read_dir("/proc").ok()?;

    for entry in entries.flatten() {
        let Ok(pid) = entry.file_name().to_string_lossy().parse::<i32>() else {
            continue;
        };
        let Ok(comm) = std::fs::read_to_string(format!("/proc/{pid}/comm")) else {
            continue;
        };
        let comm = comm.trim_end();

        let matches = if comm.len() == 15 {
            name.starts_with(comm)
        } else {
            comm == name
        };
        if matches {
            return Some(Pid::from_raw(pid));
        }
    }

    None
}

/// Resolve the main module of `pid` from its maps.
///
/// The main module is the image behind `/proc/<pid>/exe`; its extent is the
/// span from the first to the last mapping backed by that path.
fn main_module(pid: Pid) -> Result<ModuleInfo, MemoryError> {
    let exe = std::fs::read_link(format!("/proc/{}/exe", pid.as_raw())).map_err(|_| {
        MemoryError::ModuleNotFound(format!("/proc/{}/exe", pid.as_raw()))
    })?;

    let maps = std::fs::read_to_string(format!("/proc/{}/maps", pid.as_raw()))
        .map_err(|_| MemoryError::ModuleNotFound(exe.display().to_string()))?;

    let mut base = u64::MAX;
    let mut end = 0u64;

    for line in maps.lines() {
        let mut parts = line.split_whitespace();
        let Some(range) = parts.next() else { continue };
        let path = parts.nth(4);
        if path != Some(exe.to_string_lossy().as_ref()) {
            continue;
        }
        let Some((lo, hi)) = parse_map_range(range) else {
            continue;
        };
        base = base.min(lo);
        end = end.max(hi);
    }

    if base == u64::MAX {
        return Err(MemoryError::ModuleNotFound(exe.display().to_string()));
    }

    debug!(
        "main module {} spans {:#x}..{:#x}",
        exe.display(),
        base,
        end
    );

    Ok(ModuleInfo {
        base,
        size: end - base,
        path: exe,
    })
}

fn parse_map_range(range: &str) -> Option<(u64, u64)> {
    let (lo, hi) = range.split_once('-')?;
    Some((
        u64::from_str_radix(lo, 16).ok()?,
        u64::from_str_radix(hi, 16).ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_range_parsing() {
        assert_eq!(
            parse_map_range("55d0a0000000-55d0a0021000"),
            Some((0x55d0a0000000, 0x55d0a0021000))
        );
        assert_eq!(parse_map_range("nonsense"), None);
    }

    #[test]
    fn attach_to_missing_process_fails() {
        let err = ForeignProcess::attach("definitely-not-a-real-process-name").unwrap_err();
        assert!(matches!(err, MemoryError::ProcessNotFound(_)));
    }
}
