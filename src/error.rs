//! Error Types

use thiserror::Error;

/// Main error type
#[derive(Debug, Clone, Error)]
pub enum SimulationError {
    #[error("Unsupported augmentation `{spec}`: {reason}")]
    UnsupportedAugmentation { spec: String, reason: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Length mismatch for {uid}: manifest declares {expected} samples, pipeline produced {actual}")]
    LengthMismatch { uid: String, expected: usize, actual: usize },

    #[error("External process error: {message}")]
    ExternalProcess { message: String },

    #[error("Manifest error: {message}")]
    Manifest { message: String },

    #[error("Config error: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },
}

impl SimulationError {
    pub fn unsupported<S: Into<String>, R: Into<String>>(spec: S, reason: R) -> Self {
        Self::UnsupportedAugmentation { spec: spec.into(), reason: reason.into() }
    }
    pub fn audio<S: Into<String>>(msg: S) -> Self { Self::Audio { message: msg.into() } }
    pub fn external<S: Into<String>>(msg: S) -> Self { Self::ExternalProcess { message: msg.into() } }
    pub fn manifest<S: Into<String>>(msg: S) -> Self { Self::Manifest { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::Config { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { Self::Io { message: msg.into() } }
    pub fn processing<S: Into<String>>(msg: S) -> Self { Self::Processing { message: msg.into() } }

    pub fn length_mismatch<S: Into<String>>(uid: S, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch { uid: uid.into(), expected, actual }
    }

    /// Short label used when aggregating batch failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedAugmentation { .. } => "parse",
            Self::Audio { .. } => "audio_io",
            Self::LengthMismatch { .. } => "length_mismatch",
            Self::ExternalProcess { .. } => "external_process",
            Self::Manifest { .. } => "manifest",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
            Self::Processing { .. } => "processing",
        }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;

impl From<std::io::Error> for SimulationError {
    fn from(err: std::io::Error) -> Self { Self::io(err.to_string()) }
}

impl From<hound::Error> for SimulationError {
    fn from(err: hound::Error) -> Self { Self::audio(format!("WAV: {}", err)) }
}
