//! ffmpeg-based compositor for burning overlays into the clip
//!
//! One invocation per export: the base clip is scaled to a height of 1920
//! first (aspect preserved), then each overlay becomes a drawtext filter in
//! paint order, and the result is encoded without an audio track.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::overlay::Overlay;

/// Height of every exported frame; width scales to keep aspect
pub const OUTPUT_HEIGHT: u32 = 1920;

/// Configuration for the export encode
#[derive(Debug, Clone)]
pub struct CompositorConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Video codec
    pub video_codec: String,
    /// Pixel format
    pub pixel_format: String,
    /// Output frame height
    pub output_height: u32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: which::which("ffmpeg").map_or_else(
                |_| "ffmpeg".to_string(),
                |p| p.to_string_lossy().to_string(),
            ),
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            output_height: OUTPUT_HEIGHT,
        }
    }
}

impl CompositorConfig {
    /// Override the ffmpeg binary path
    #[must_use]
    pub fn with_ffmpeg_path(mut self, path: &str) -> Self {
        self.ffmpeg_path = path.to_string();
        self
    }

    /// Override the output frame height
    #[must_use]
    pub fn with_output_height(mut self, height: u32) -> Self {
        self.output_height = height;
        self
    }
}

/// ffmpeg-based compositor and exporter
pub struct Compositor {
    config: CompositorConfig,
}

impl Compositor {
    /// Create a compositor with default config
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CompositorConfig::default(),
        }
    }

    /// Create a compositor with custom config
    #[must_use]
    pub fn with_config(config: CompositorConfig) -> Self {
        Self { config }
    }

    /// Output frame height this compositor scales to
    #[must_use]
    pub fn output_height(&self) -> u32 {
        self.config.output_height
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

    /// Build the full filter chain: scale first, then one drawtext per overlay
    fn build_filter(&self, overlays: &[Overlay]) -> String {
        let mut filters = vec![format!("scale=-2:{}", self.config.output_height)];
        for overlay in overlays {
            filters.push(overlay.to_drawtext());
        }
        filters.join(",")
    }

    /// Build the ffmpeg argument vector for one export
    fn build_args(&self, input: &Path, output: &Path, filter: &str) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            filter.to_string(),
            "-an".to_string(),
            "-c:v".to_string(),
            self.config.video_codec.clone(),
            "-pix_fmt".to_string(),
            self.config.pixel_format.clone(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Burn `overlays` into `input`, writing `result_<uuid>.mp4` under
    /// `export_dir`.
    ///
    /// The export file is left in place for the caller; nothing here deletes
    /// it.
    pub async fn export(
        &self,
        input: &Path,
        overlays: &[Overlay],
        export_dir: &Path,
    ) -> Result<PathBuf> {
        let output = export_dir.join(format!("result_{}.mp4", Uuid::new_v4()));
        let filter = self.build_filter(overlays);
        let args = self.build_args(input, &output, &filter);

        debug!("ffmpeg export args: {:?}", args);

        let result = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).to_string();
            return Err(PipelineError::ExportFailed(stderr));
        }

        match tokio::fs::metadata(&output).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => {
                return Err(PipelineError::ExportFailed(
                    "no output file produced".to_string(),
                ))
            }
        }

        info!("exported {:?}", output);
        Ok(output)
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::build_overlays;

    #[test]
    fn test_config_defaults() {
        let config = CompositorConfig::default();
        assert_eq!(config.video_codec, "libx264");
        assert_eq!(config.pixel_format, "yuv420p");
        assert_eq!(config.output_height, 1920);
    }

    #[test]
    fn test_build_filter_scale_only() {
        let compositor = Compositor::new();
        assert_eq!(compositor.build_filter(&[]), "scale=-2:1920");
    }

    #[test]
    fn test_build_filter_scale_comes_first() {
        let compositor = Compositor::new();
        let overlays = build_overlays("Acme", "Widget", "Hello\nWorld", 15.0, 1920)
            .expect("overlays");
        let filter = compositor.build_filter(&overlays);

        assert!(filter.starts_with("scale=-2:1920,drawtext="));
        assert_eq!(filter.matches("drawtext=").count(), 4);
    }

    #[test]
    fn test_build_filter_preserves_paint_order() {
        let compositor = Compositor::new();
        let overlays = build_overlays("Acme", "Widget", "Hello\nWorld", 15.0, 1920)
            .expect("overlays");
        let filter = compositor.build_filter(&overlays);

        let brand = filter.find("text=Acme").expect("brand");
        let product = filter.find("text=Widget").expect("product");
        let first_caption = filter.find("text=Hello").expect("caption 1");
        let second_caption = filter.find("text=World").expect("caption 2");
        assert!(brand < product);
        assert!(product < first_caption);
        assert!(first_caption < second_caption);
    }

    #[test]
    fn test_build_filter_respects_custom_height() {
        let compositor =
            Compositor::with_config(CompositorConfig::default().with_output_height(1280));
        assert_eq!(compositor.build_filter(&[]), "scale=-2:1280");
    }

    #[test]
    fn test_build_args_silent_h264_output() {
        let compositor = Compositor::new();
        let args = compositor.build_args(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            "scale=-2:1920",
        );

        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(args.last(), Some(&"out.mp4".to_string()));

        let vf = args.iter().position(|a| a == "-vf").expect("-vf");
        assert_eq!(args[vf + 1], "scale=-2:1920");
        let cv = args.iter().position(|a| a == "-c:v").expect("-c:v");
        assert_eq!(args[cv + 1], "libx264");
    }

    #[tokio::test]
    async fn test_check_available_missing_binary() {
        let compositor = Compositor::with_config(
            CompositorConfig::default().with_ffmpeg_path("/nonexistent/ffmpeg"),
        );
        assert!(!compositor.check_available().await);
    }

    #[tokio::test]
    async fn test_export_missing_binary_fails() {
        let compositor = Compositor::with_config(
            CompositorConfig::default().with_ffmpeg_path("/nonexistent/ffmpeg"),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let overlays = build_overlays("a", "b", "c", 15.0, 1920).expect("overlays");

        let result = compositor
            .export(Path::new("in.mp4"), &overlays, dir.path())
            .await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_export_kills_encoder() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("finished");

        // Stand-in encoder that takes a while, then records that it ran to
        // completion
        let fake_ffmpeg = dir.path().join("ffmpeg");
        std::fs::write(
            &fake_ffmpeg,
            format!("#!/bin/sh\nsleep 2\nprintf done > \"{}\"\n", marker.display()),
        )
        .expect("write stub");
        std::fs::set_permissions(&fake_ffmpeg, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");

        let compositor = Compositor::with_config(
            CompositorConfig::default().with_ffmpeg_path(&fake_ffmpeg.to_string_lossy()),
        );
        let overlays = build_overlays("a", "b", "c", 15.0, 1920).expect("overlays");

        // Abandon the export long before the encoder finishes
        let export = compositor.export(Path::new("in.mp4"), &overlays, dir.path());
        let abandoned = tokio::time::timeout(Duration::from_millis(200), export).await;
        assert!(abandoned.is_err());

        // A killed encoder never reaches the marker write
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(
            !marker.exists(),
            "encoder kept running after the request was dropped"
        );
    }
}
