//! cadence - live Black Ops III sound alias patcher
//!
//! Attaches to a running, modded game, locates its sound bank tables by
//! byte signature, then watches the mod's sound folder and re-applies CSV
//! alias edits into game memory on every change.
//!
//! Any command line arguments are treated as alias file names to restrict
//! patching to, on top of the `alias_files` config key.

use std::error::Error;
use std::path::Path;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cadence_core::{config, watch, CadenceConfig, Session, SoundPaths};
use cadence_memory::ForeignProcess;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("-------------------------------------------------");
    println!("cadence: live sound alias patching for Black Ops III");
    println!("version {}", env!("CARGO_PKG_VERSION"));
    println!("-------------------------------------------------");

    if let Err(err) = run() {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CadenceConfig::load(&config::default_config_path())?;

    let mut allow_list: Vec<String> = config
        .alias_files
        .iter()
        .map(|name| name.to_lowercase())
        .collect();
    for arg in std::env::args().skip(1) {
        if let Some(stem) = Path::new(&arg).file_stem() {
            allow_list.push(stem.to_string_lossy().to_lowercase());
        }
    }
    if !allow_list.is_empty() {
        info!("restricting alias files to: {}", allow_list.join(", "));
    }

    info!("initializing, please wait...");
    let process = ForeignProcess::attach(&config.process_name)?;
    let module = process.module().clone();

    let sound_root = config.sound_dir(module.dir());
    let paths = SoundPaths::under(&sound_root);
    info!("sound folder: {}", sound_root.display());

    // watch before the initial scan so edits made during it are not lost
    let events = watch::spawn(&sound_root)?;

    let mut session = Session::discover(process, module.base, module.end(), paths, allow_list)?;

    watch::run(&mut session, &events)?;
    Ok(())
}
