//! Source registries built from `uid sample_rate path` list files

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::SourceConfig;
use crate::error::{SimulationError, Result};

/// One line of a source list.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    pub uid: String,
    pub sample_rate: u32,
    pub path: PathBuf,
}

/// Parse one source list. Blank lines and `#` comments are skipped.
pub fn parse_source_list(content: &str, origin: &str) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[uid, fs, path] = fields.as_slice() else {
            return Err(SimulationError::config(format!(
                "{}:{}: expected `uid sample_rate path`, found {} fields",
                origin, index + 1, fields.len()
            )));
        };
        let sample_rate = fs
            .parse::<u32>()
            .map_err(|_| SimulationError::config(format!("{}:{}: invalid sample rate `{}`", origin, index + 1, fs)))?;
        entries.push(SourceEntry { uid: uid.to_string(), sample_rate, path: PathBuf::from(path) });
    }
    Ok(entries)
}

/// Merge several list files into one `uid -> path` map; a repeated uid is an error.
pub fn read_source_lists<P: AsRef<Path>>(paths: &[P]) -> Result<HashMap<String, PathBuf>> {
    let mut map = HashMap::new();
    for path in paths {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| SimulationError::config(format!("Cannot read source list {}: {}", path.display(), e)))?;
        for entry in parse_source_list(&content, &path.display().to_string())? {
            if map.contains_key(&entry.uid) {
                return Err(SimulationError::config(format!(
                    "Duplicate source id `{}` in {}",
                    entry.uid,
                    path.display()
                )));
            }
            map.insert(entry.uid, entry.path);
        }
    }
    Ok(map)
}

/// Immutable lookup tables for every kind of source.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    speech: HashMap<String, PathBuf>,
    noise: HashMap<String, PathBuf>,
    wind_noise: HashSet<String>,
    rir: HashMap<String, PathBuf>,
}

impl SourceRegistry {
    pub fn from_config(sources: &SourceConfig) -> Result<Self> {
        let registry = Self::from_maps(
            read_source_lists(&sources.speech_scps)?,
            read_source_lists(&sources.noise_scps)?,
            read_source_lists(&sources.wind_noise_scps)?,
            read_source_lists(&sources.rir_scps)?,
        );
        info!(
            "Loaded {} speech, {} noise ({} wind), {} RIR sources",
            registry.speech.len(),
            registry.noise.len(),
            registry.wind_noise.len(),
            registry.rir.len()
        );
        Ok(registry)
    }

    /// Wind-noise entries are merged into the noise table and win on collision.
    pub fn from_maps(
        speech: HashMap<String, PathBuf>,
        mut noise: HashMap<String, PathBuf>,
        wind_noise: HashMap<String, PathBuf>,
        rir: HashMap<String, PathBuf>,
    ) -> Self {
        let wind_ids = wind_noise.keys().cloned().collect();
        noise.extend(wind_noise);
        Self { speech, noise, wind_noise: wind_ids, rir }
    }

    pub fn speech_path(&self, uid: &str) -> Result<&Path> {
        lookup(&self.speech, "speech", uid)
    }

    pub fn noise_path(&self, uid: &str) -> Result<&Path> {
        lookup(&self.noise, "noise", uid)
    }

    pub fn rir_path(&self, uid: &str) -> Result<&Path> {
        lookup(&self.rir, "RIR", uid)
    }

    /// Wind noise either came from a wind-noise list or is named like one.
    pub fn is_wind_noise(&self, uid: &str) -> bool {
        self.wind_noise.contains(uid) || uid.starts_with("wind_noise")
    }

    pub fn speech_count(&self) -> usize {
        self.speech.len()
    }

    pub fn noise_count(&self) -> usize {
        self.noise.len()
    }

    pub fn rir_count(&self) -> usize {
        self.rir.len()
    }
}

fn lookup<'a>(map: &'a HashMap<String, PathBuf>, kind: &str, uid: &str) -> Result<&'a Path> {
    map.get(uid)
        .map(PathBuf::as_path)
        .ok_or_else(|| SimulationError::manifest(format!("Unknown {} source `{}`", kind, uid)))
}
