//! speechsim - Paired Clean/Noisy Speech Simulator

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::process;
use std::sync::Arc;
use speechsim::config::Config;
use speechsim::external::FfmpegBackend;
use speechsim::manifest::{read_manifest, ManifestEntry};
use speechsim::processing::{check_entry, BatchDispatcher, SampleSimulator};
use speechsim::registry::SourceRegistry;
use speechsim::transforms::PeakWindowEstimator;
use speechsim::{init_logging, Args};

fn main() {
    let args = Args::parse();

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns whether every sample succeeded.
fn run(args: Args) -> Result<bool> {
    let dry_run = args.dry_run;
    let save_config = args.save_config.clone();
    let config = Config::from_args_and_config(args).context("Invalid configuration")?;

    init_logging(config.processing.verbose);
    if config.processing.verbose {
        println!("{} v{}", speechsim::NAME, speechsim::VERSION);
    }

    if let Some(path) = save_config {
        config
            .save_to_file(&path)
            .with_context(|| format!("Cannot save config to {}", path.display()))?;
        info!("Saved effective config to {}", path.display());
    }

    let registry = SourceRegistry::from_config(&config.sources).context("Cannot load source lists")?;
    let entries = read_manifest(&config.manifest_path)
        .with_context(|| format!("Cannot load manifest {}", config.manifest_path.display()))?;

    println!("=== speechsim ===");
    println!("Manifest: {} ({} rows)", config.manifest_path.display(), entries.len());
    println!(
        "Sources: {} speech, {} noise, {} rir",
        registry.speech_count(),
        registry.noise_count(),
        registry.rir_count()
    );

    if dry_run {
        return Ok(dry_run_check(&registry, &entries));
    }

    println!("Workers: {} (chunk size {})", config.processing.workers, config.processing.chunk_size);
    println!("=================\n");

    let backend = Arc::new(FfmpegBackend::new(
        config.external.ffmpeg_path.clone(),
        config.external.scratch_dir.clone(),
    ));
    let simulator = SampleSimulator::new(&registry, config.simulation_options(), backend.clone(), backend)
        .with_early_rir(Arc::new(PeakWindowEstimator { early_ms: config.simulation.early_rir_ms }));

    let report = BatchDispatcher::from_config(&config.processing)
        .run_simulation(&entries, &simulator)
        .context("Simulation aborted")?;

    println!("{}", report);
    Ok(report.is_success())
}

fn dry_run_check(registry: &SourceRegistry, entries: &[ManifestEntry]) -> bool {
    let mut failed = 0usize;
    for entry in entries {
        if let Err(e) = check_entry(registry, entry) {
            error!("Sample {} would fail: {}", entry.id, e);
            failed += 1;
        }
    }
    println!("Dry run: {} rows checked, {} invalid", entries.len(), failed);
    failed == 0
}
