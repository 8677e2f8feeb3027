//! Sound folder watching and the reload driver
//!
//! A dedicated thread watches the sound folder tree with inotify and
//! publishes one event per interesting change over a channel. The driver
//! consumes that channel on a single thread: it waits for an event, lets
//! the burst settle, drains whatever else queued up, and runs the pipeline
//! once. That serializes overlapping triggers - a save-from-editor that
//! fires four filesystem events still causes exactly one reload, and a
//! trigger landing mid-run simply queues the next run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, WatchDescriptor};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use cadence_memory::MemorySource;

use crate::session::{Session, SessionError};
use crate::tabular;

/// How long to let a burst of filesystem events settle before reloading.
const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Errors from setting up the watcher
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to initialize inotify: {0}")]
    Init(#[source] nix::Error),

    #[error("failed to watch {path:?}: {source}")]
    AddWatch { path: PathBuf, source: nix::Error },

    #[error("failed to spawn the watch thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// One observed change under the watched tree.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: PathBuf,
}

/// Start watching `root` recursively. Returns the event channel; the
/// watcher thread runs for the life of the process.
pub fn spawn(root: &Path) -> Result<Receiver<WatchEvent>, WatchError> {
    let inotify = Inotify::init(InitFlags::empty()).map_err(WatchError::Init)?;
    let mut dirs = Vec::new();
    add_tree(&inotify, root, &mut dirs)?;

    let (tx, rx) = unbounded();
    std::thread::Builder::new()
        .name("sound-watch".to_string())
        .spawn(move || watch_loop(inotify, dirs, tx))?;

    Ok(rx)
}

const WATCH_MASK: AddWatchFlags = AddWatchFlags::IN_CREATE
    .union(AddWatchFlags::IN_MODIFY)
    .union(AddWatchFlags::IN_DELETE)
    .union(AddWatchFlags::IN_MOVED_FROM)
    .union(AddWatchFlags::IN_MOVED_TO);

/// Watch `dir` and every directory below it. inotify watches are per
/// directory, so the tree is walked up front and extended as directories
/// appear later.
fn add_tree(
    inotify: &Inotify,
    dir: &Path,
    dirs: &mut Vec<(WatchDescriptor, PathBuf)>,
) -> Result<(), WatchError> {
    if !dir.is_dir() {
        warn!("not watching {}: no such directory", dir.display());
        return Ok(());
    }

    let wd = inotify
        .add_watch(dir, WATCH_MASK)
        .map_err(|source| WatchError::AddWatch {
            path: dir.to_path_buf(),
            source,
        })?;
    dirs.push((wd, dir.to_path_buf()));
    debug!("watching {}", dir.display());

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                add_tree(inotify, &path, dirs)?;
            }
        }
    }

    Ok(())
}

fn watch_loop(
    inotify: Inotify,
    mut dirs: Vec<(WatchDescriptor, PathBuf)>,
    tx: Sender<WatchEvent>,
) {
    loop {
        let events = match inotify.read_events() {
            Ok(events) => events,
            Err(err) => {
                error!("inotify read failed: {err}");
                return;
            }
        };

        for event in events {
            let Some(dir) = dirs
                .iter()
                .find(|(wd, _)| *wd == event.wd)
                .map(|(_, path)| path.clone())
            else {
                continue;
            };
            let path = match &event.name {
                Some(name) => dir.join(name),
                None => dir.clone(),
            };

            if event.mask.contains(AddWatchFlags::IN_ISDIR) {
                // a new directory extends the watched tree; any directory
                // change may have moved alias files around
                if event
                    .mask
                    .intersects(AddWatchFlags::IN_CREATE | AddWatchFlags::IN_MOVED_TO)
                {
                    if let Err(err) = add_tree(&inotify, &path, &mut dirs) {
                        warn!("failed to extend watch: {err}");
                    }
                }
                if tx.send(WatchEvent { path }).is_err() {
                    return;
                }
            } else if tabular::is_tabular(&path) {
                if tx.send(WatchEvent { path }).is_err() {
                    return;
                }
            }
        }
    }
}

/// Drive reloads from watch events until the channel closes or a fatal
/// condition ends the session. Never reloads concurrently; bursts coalesce
/// into a single run.
pub fn run<S: MemorySource>(
    session: &mut Session<S>,
    events: &Receiver<WatchEvent>,
) -> Result<(), SessionError> {
    info!("watching for changes...");

    for event in events.iter() {
        std::thread::sleep(SETTLE_DELAY);
        let mut latest = event;
        while let Ok(next) = events.try_recv() {
            latest = next;
        }

        info!(
            "change detected at {}, updating aliases...",
            latest.path.display()
        );
        session.reload()?;
        info!("watching for changes...");
    }

    Ok(())
}
