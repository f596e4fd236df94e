//! ffmpeg subprocess backend for sidechain compression and MP3 round trips

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;
use tempfile::TempDir;

use crate::audio::{read_wav, write_wav, AudioBuffer, AudioFormat};
use crate::error::{SimulationError, Result};
use crate::transforms::{LossyCodec, SidechainCompressor, SidechainOutput, SidechainParams};

/// Filter graph that ducks input 0 by the envelope of input 1 and mixes the result with input 1.
pub fn sidechain_filter(params: &SidechainParams) -> String {
    format!(
        "[1:a]asplit=2[sc][mix];\
         [0:a][sc]sidechaincompress=threshold={}:ratio={}:level_sc={}:release={}:attack={}[compr];\
         [compr][mix]amix",
        params.threshold, params.ratio, params.sc_gain, params.release, params.attack
    )
}

/// Runs `ffmpeg` on temporary WAV files.
///
/// Every call gets its own scratch directory under `scratch_dir`, named
/// after the sample, and removed when the call returns.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: Option<PathBuf>,
    scratch_dir: PathBuf,
}

impl FfmpegBackend {
    pub fn new(binary: Option<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self { binary, scratch_dir: scratch_dir.into() }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Configured binary if any, otherwise `ffmpeg` from `PATH`.
    ///
    /// Resolved per call so runs that never need ffmpeg do not require it.
    fn find_ffmpeg(&self) -> Result<PathBuf> {
        let wanted = self.binary.clone().unwrap_or_else(|| PathBuf::from("ffmpeg"));
        which::which(&wanted)
            .map_err(|e| SimulationError::external(format!("ffmpeg binary {} not found: {}", wanted.display(), e)))
    }

    fn scratch(&self, tag: &str) -> Result<TempDir> {
        fs::create_dir_all(&self.scratch_dir)?;
        tempfile::Builder::new()
            .prefix(&format!("{}_", sanitize_tag(tag)))
            .tempdir_in(&self.scratch_dir)
            .map_err(|e| SimulationError::io(format!("Cannot create scratch directory: {}", e)))
    }

    fn run(&self, args: Vec<OsString>) -> Result<()> {
        let binary = self.find_ffmpeg()?;
        let mut cmd = Command::new(&binary);
        cmd.arg("-y")
            .arg("-nostdin")
            .args(["-loglevel", "error"])
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        debug!("Running {} {:?}", binary.display(), args);

        let output = cmd
            .output()
            .map_err(|e| SimulationError::external(format!("Failed to start {}: {}", binary.display(), e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SimulationError::external(format!(
                "ffmpeg exited with status {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

fn sanitize_tag(tag: &str) -> String {
    tag.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Read a file ffmpeg was supposed to produce.
fn read_output(path: &Path, what: &str) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(SimulationError::external(format!("ffmpeg produced no {} at {}", what, path.display())));
    }
    let audio = read_wav(path).map_err(|e| SimulationError::external(format!("Unreadable {}: {}", what, e)))?;
    if audio.is_empty() {
        return Err(SimulationError::external(format!("ffmpeg produced an empty {}", what)));
    }
    if !audio.is_finite() {
        return Err(SimulationError::external(format!("{} contains non-finite samples", what)));
    }
    Ok(audio)
}

impl SidechainCompressor for FfmpegBackend {
    fn compress_and_mix(
        &self,
        carrier: &AudioBuffer,
        modulator: &AudioBuffer,
        params: &SidechainParams,
        tag: &str,
    ) -> Result<SidechainOutput> {
        let scratch = self.scratch(tag)?;
        let speech_path = scratch.path().join("speech.wav");
        let noise_path = scratch.path().join("noise.wav");
        let mix_path = scratch.path().join("mix.wav");

        write_wav(&speech_path, carrier, AudioFormat::Float32)?;
        write_wav(&noise_path, modulator, AudioFormat::Float32)?;

        self.run(vec![
            "-i".into(),
            speech_path.clone().into(),
            "-i".into(),
            noise_path.clone().into(),
            "-filter_complex".into(),
            sidechain_filter(params).into(),
            "-c:a".into(),
            "pcm_f32le".into(),
            mix_path.clone().into(),
        ])?;

        let mix = read_output(&mix_path, "sidechain mix")?;
        let modulator = read_output(&noise_path, "sidechain noise")?;
        Ok(SidechainOutput { mix, modulator })
    }
}

impl LossyCodec for FfmpegBackend {
    fn round_trip(&self, audio: &AudioBuffer, vbr_quality: f64, tag: &str) -> Result<AudioBuffer> {
        let scratch = self.scratch(tag)?;
        let input_path = scratch.path().join("input.wav");
        let coded_path = scratch.path().join("coded.mp3");
        let decoded_path = scratch.path().join("decoded.wav");

        write_wav(&input_path, audio, AudioFormat::Float32)?;

        self.run(vec![
            "-i".into(),
            input_path.into(),
            "-c:a".into(),
            "libmp3lame".into(),
            "-q:a".into(),
            vbr_quality.to_string().into(),
            coded_path.clone().into(),
        ])?;
        if !coded_path.exists() {
            return Err(SimulationError::external("MP3 encoder produced no output"));
        }

        self.run(vec![
            "-i".into(),
            coded_path.into(),
            "-ar".into(),
            audio.sample_rate().to_string().into(),
            "-c:a".into(),
            "pcm_f32le".into(),
            decoded_path.clone().into(),
        ])?;

        read_output(&decoded_path, "decoded MP3")
    }
}
