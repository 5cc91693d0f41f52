//! Input normalization via ffmpeg
//!
//! Arbitrary uploads are forced into H.264/yuv420p video + AAC audio in an
//! MP4 container before anything else looks at them. One attempt per upload,
//! hard timeout, no retry.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PipelineError, Result};

/// Hard ceiling on a single conversion, seconds
pub const TRANSCODE_TIMEOUT_SECS: u64 = 300;

/// Configuration for the normalization step
#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Encoder preset
    pub preset: String,
    /// Video codec
    pub video_codec: String,
    /// Pixel format
    pub pixel_format: String,
    /// Audio codec
    pub audio_codec: String,
    /// Audio bitrate
    pub audio_bitrate: String,
    /// Kill the encoder after this long
    pub timeout: Duration,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: which::which("ffmpeg").map_or_else(
                |_| "ffmpeg".to_string(),
                |p| p.to_string_lossy().to_string(),
            ),
            preset: "ultrafast".to_string(),
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            timeout: Duration::from_secs(TRANSCODE_TIMEOUT_SECS),
        }
    }
}

impl TranscoderConfig {
    /// Override the ffmpeg binary path
    #[must_use]
    pub fn with_ffmpeg_path(mut self, path: &str) -> Self {
        self.ffmpeg_path = path.to_string();
        self
    }

    /// Override the conversion timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fresh collision-free output path under `work_dir`
fn fresh_output_path(work_dir: &Path) -> PathBuf {
    work_dir.join(format!("{}_converted_safe.mp4", Uuid::new_v4()))
}

/// ffmpeg-based input normalizer
pub struct Transcoder {
    config: TranscoderConfig,
}

impl Transcoder {
    /// Create a transcoder with default config
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: TranscoderConfig::default(),
        }
    }

    /// Create a transcoder with custom config
    #[must_use]
    pub fn with_config(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Check if ffmpeg is available
    pub async fn check_available(&self) -> bool {
        Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Build the argument vector for one conversion
    fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-preset".to_string(),
            self.config.preset.clone(),
            "-c:v".to_string(),
            self.config.video_codec.clone(),
            "-pix_fmt".to_string(),
            self.config.pixel_format.clone(),
            "-c:a".to_string(),
            self.config.audio_codec.clone(),
            "-b:a".to_string(),
            self.config.audio_bitrate.clone(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Normalize `input` into a fresh H.264/AAC mp4 under `work_dir`.
    ///
    /// Returns the path of the converted file. A non-zero exit surfaces the
    /// encoder's stderr, a missing or empty output fails distinctly, and the
    /// timeout kills the child process.
    pub async fn normalize(&self, input: &Path, work_dir: &Path) -> Result<PathBuf> {
        let output = fresh_output_path(work_dir);
        let args = self.build_args(input, &output);

        debug!("ffmpeg transcode args: {:?}", args);

        let mut command = Command::new(&self.config.ffmpeg_path);
        command
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = match tokio::time::timeout(self.config.timeout, command.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(PipelineError::TranscodeTimeout(
                    self.config.timeout.as_secs(),
                ))
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).to_string();
            return Err(PipelineError::TranscodeFailed(stderr));
        }

        match tokio::fs::metadata(&output).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(PipelineError::TranscodeOutputMissing),
        }

        info!("normalized {:?} -> {:?}", input, output);
        Ok(output)
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new()
    }
}
