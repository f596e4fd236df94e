//! Configuration management for batch simulation

use crate::audio::AudioFormat;
use crate::error::{SimulationError, Result};
use crate::processing::SimulationOptions;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub manifest_path: PathBuf,
    pub sources: SourceConfig,
    pub simulation: SimulationConfig,
    pub processing: ProcessingConfig,
    pub external: ExternalConfig,
}

/// Source-list files, each line `uid sample_rate path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub speech_scps: Vec<PathBuf>,
    pub noise_scps: Vec<PathBuf>,
    pub wind_noise_scps: Vec<PathBuf>,
    pub rir_scps: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub force_mono: bool,
    pub store_noise: bool,
    pub output_format: AudioFormat,
    pub headroom: f32,
    /// Early reflection window after the direct path, in milliseconds.
    pub early_rir_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub workers: usize,
    pub chunk_size: usize,
    pub fail_fast: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// Resolved from `PATH` when unset.
    pub ffmpeg_path: Option<PathBuf>,
    pub scratch_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("manifest.tsv"),
            sources: SourceConfig::default(),
            simulation: SimulationConfig::default(),
            processing: ProcessingConfig::default(),
            external: ExternalConfig::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            force_mono: true,
            store_noise: false,
            output_format: AudioFormat::Int16,
            headroom: 0.9,
            early_rir_ms: 50.0,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: utils::cpu_count(),
            chunk_size: 1000,
            fail_fast: false,
            verbose: false,
        }
    }
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            scratch_dir: PathBuf::from("./simulation_tmp"),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "speechsim", about = "Paired clean/noisy speech simulator", version, author)]
pub struct Args {
    #[arg(short = 'm', long = "manifest", help = "Simulation manifest (TSV with header row)")]
    pub manifest: Option<PathBuf>,

    #[arg(long = "speech-scps", num_args = 1.., help = "Speech source lists")]
    pub speech_scps: Vec<PathBuf>,

    #[arg(long = "noise-scps", num_args = 1.., help = "Noise source lists")]
    pub noise_scps: Vec<PathBuf>,

    #[arg(long = "wind-noise-scps", num_args = 1.., help = "Wind noise source lists")]
    pub wind_noise_scps: Vec<PathBuf>,

    #[arg(long = "rir-scps", num_args = 1.., help = "Room impulse response source lists")]
    pub rir_scps: Vec<PathBuf>,

    #[arg(short = 'j', long = "nj", help = "Number of parallel workers")]
    pub nj: Option<usize>,

    #[arg(long = "chunksize", help = "Samples handled per scheduling unit")]
    pub chunksize: Option<usize>,

    #[arg(long = "store-noise", help = "Also write the scaled noise signal")]
    pub store_noise: bool,

    #[arg(long = "fail-fast", help = "Abort the batch on the first failed sample")]
    pub fail_fast: bool,

    #[arg(long = "ffmpeg", help = "ffmpeg binary path")]
    pub ffmpeg: Option<PathBuf>,

    #[arg(long = "scratch-dir", help = "Directory for temporary ffmpeg files")]
    pub scratch_dir: Option<PathBuf>,

    #[arg(long = "output-format", help = "Output sample format (int16 or float32)")]
    pub output_format: Option<AudioFormat>,

    #[arg(short = 'c', long = "config", help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,

    #[arg(long = "save-config", help = "Write the effective config to this path")]
    pub save_config: Option<PathBuf>,

    #[arg(long = "dry-run", help = "Check every recipe and source without processing audio")]
    pub dry_run: bool,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output mode")]
    pub verbose: bool,
}

impl Config {
    /// Create config from command line arguments and config file
    pub fn from_args_and_config(args: Args) -> Result<Self> {
        let mut config = if let Some(config_path) = &args.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        // Command line arguments override config file settings
        if let Some(manifest) = args.manifest {
            config.manifest_path = manifest;
        }
        override_list(&mut config.sources.speech_scps, args.speech_scps);
        override_list(&mut config.sources.noise_scps, args.noise_scps);
        override_list(&mut config.sources.wind_noise_scps, args.wind_noise_scps);
        override_list(&mut config.sources.rir_scps, args.rir_scps);
        if let Some(nj) = args.nj {
            config.processing.workers = nj;
        }
        if let Some(chunksize) = args.chunksize {
            config.processing.chunk_size = chunksize;
        }
        config.simulation.store_noise |= args.store_noise;
        config.processing.fail_fast |= args.fail_fast;
        config.processing.verbose |= args.verbose;
        if args.ffmpeg.is_some() {
            config.external.ffmpeg_path = args.ffmpeg;
        }
        if let Some(scratch_dir) = args.scratch_dir {
            config.external.scratch_dir = scratch_dir;
        }
        if let Some(format) = args.output_format {
            config.simulation.output_format = format;
        }

        config.validate()?;

        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimulationError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SimulationError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        if self.sources.speech_scps.is_empty() {
            return Err(SimulationError::config("At least one speech source list is required"));
        }
        if self.sources.noise_scps.is_empty() && self.sources.wind_noise_scps.is_empty() {
            return Err(SimulationError::config("At least one noise or wind noise source list is required"));
        }

        if self.processing.workers == 0 {
            return Err(SimulationError::config("Worker count must be greater than 0"));
        }
        if self.processing.workers > utils::cpu_count() * 4 {
            return Err(SimulationError::config("Worker count cannot exceed 4x logical CPU cores"));
        }
        if self.processing.chunk_size == 0 {
            return Err(SimulationError::config("Chunk size must be greater than 0"));
        }

        if !(self.simulation.headroom > 0.0 && self.simulation.headroom <= 1.0) {
            return Err(SimulationError::config("Headroom must be in range (0.0, 1.0]"));
        }
        if !(self.simulation.early_rir_ms > 0.0) {
            return Err(SimulationError::config("Early RIR window must be greater than 0 ms"));
        }

        Ok(())
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SimulationError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SimulationError::config(format!("Failed to write config file: {}", e)))
    }

    pub fn simulation_options(&self) -> SimulationOptions {
        SimulationOptions {
            force_mono: self.simulation.force_mono,
            store_noise: self.simulation.store_noise,
            output_format: self.simulation.output_format,
            headroom: self.simulation.headroom,
        }
    }
}

fn override_list(target: &mut Vec<PathBuf>, from_cli: Vec<PathBuf>) {
    if !from_cli.is_empty() {
        *target = from_cli;
    }
}

pub mod utils {
    pub fn cpu_count() -> usize {
        num_cpus::get()
    }
}
