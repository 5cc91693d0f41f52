//! Error types for the processing pipeline
//!
//! Every failure a request can hit ends up here: external tool failures keep
//! the tool's own diagnostic text, validation failures name the violated
//! constraint and the offending value.

use thiserror::Error;

/// Pipeline errors, surfaced verbatim to the client behind the failure marker
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("ffmpeg conversion failed:\n{0}")]
    TranscodeFailed(String),

    #[error("transcoded mp4 file is missing or empty")]
    TranscodeOutputMissing,

    #[error("ffmpeg conversion did not finish within {0} seconds")]
    TranscodeTimeout(u64),

    #[error("ffprobe failed: {0}")]
    Probe(String),

    #[error("video must be at least {min} seconds long, got {actual:.1}s")]
    TooShort { actual: f64, min: f64 },

    #[error("video may be at most {max} seconds long, got {actual:.1}s")]
    TooLong { actual: f64, max: f64 },

    #[error("landscape and square videos are not allowed, got {width}x{height}; only portrait is accepted")]
    NotPortrait { width: u32, height: u32 },

    #[error("caption script is empty")]
    EmptyScript,

    #[error("export failed:\n{0}")]
    ExportFailed(String),

    #[error("no video file in request")]
    MissingVideo,

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
