//! Clip metadata and validation
//!
//! Metadata comes from ffprobe's JSON output; nothing here decodes frames.
//! A clip is accepted only when it runs 10 to 120 seconds and is strictly
//! portrait (taller than wide). Square frames fail the orientation check.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Shortest accepted clip, seconds
pub const MIN_DURATION_SECS: f64 = 10.0;
/// Longest accepted clip, seconds
pub const MAX_DURATION_SECS: f64 = 120.0;

/// Probed metadata for one clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl ClipInfo {
    /// True when height strictly exceeds width
    #[must_use]
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// Enforce the duration bounds and the portrait-only rule
    pub fn validate(&self) -> Result<()> {
        if self.duration < MIN_DURATION_SECS {
            return Err(PipelineError::TooShort {
                actual: self.duration,
                min: MIN_DURATION_SECS,
            });
        }
        if self.duration > MAX_DURATION_SECS {
            return Err(PipelineError::TooLong {
                actual: self.duration,
                max: MAX_DURATION_SECS,
            });
        }
        if !self.is_portrait() {
            return Err(PipelineError::NotPortrait {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// ffprobe-based metadata reader
pub struct Prober {
    ffprobe_path: String,
}

impl Prober {
    /// Create a prober, resolving ffprobe through PATH
    #[must_use]
    pub fn new() -> Self {
        Self {
            ffprobe_path: which::which("ffprobe").map_or_else(
                |_| "ffprobe".to_string(),
                |p| p.to_string_lossy().to_string(),
            ),
        }
    }

    /// Create a prober with an explicit ffprobe path
    #[must_use]
    pub fn with_path(path: &str) -> Self {
        Self {
            ffprobe_path: path.to_string(),
        }
    }

    /// Check if ffprobe is available
    pub async fn check_available(&self) -> bool {
        Command::new(&self.ffprobe_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Read duration and frame geometry for the file at `path`
    pub async fn probe(&self, path: &Path) -> Result<ClipInfo> {
        let path_arg = path.to_string_lossy().to_string();
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(&path_arg)
            .output()
            .await?;

        if !output.status.success() {
            return Err(PipelineError::Probe(format!(
                "ffprobe exited with {}",
                output.status
            )));
        }

        let info = parse_probe_output(&output.stdout)?;
        debug!(
            "probed {:?}: {:.1}s {}x{}",
            path, info.duration, info.width, info.height
        );
        Ok(info)
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_probe_output(raw: &[u8]) -> Result<ClipInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(raw)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| PipelineError::Probe("no video stream found".to_string()))?;

    let duration = probe.format.duration.parse::<f64>().map_err(|_| {
        PipelineError::Probe(format!("unparseable duration {:?}", probe.format.duration))
    })?;

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(PipelineError::Probe(
                "video stream has no dimensions".to_string(),
            ))
        }
    };

    Ok(ClipInfo {
        duration,
        width,
        height,
    })
}

/// ffprobe JSON output structure
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: String,
}
