//! speechsim - Paired Clean/Noisy Speech Simulation Library
//!
//! Reads a manifest of simulation rows, renders each row's degradation
//! recipe over speech, noise and room impulse responses, and writes aligned
//! clean/noisy WAV pairs in parallel.

pub mod audio;
pub mod augment;
pub mod config;
pub mod error;
pub mod external;
pub mod manifest;
pub mod processing;
pub mod registry;
pub mod rng;
pub mod transforms;

pub use config::{Config, Args};
pub use error::{SimulationError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

pub fn init_logging(verbose: bool) {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .try_init()
        .ok();
}
