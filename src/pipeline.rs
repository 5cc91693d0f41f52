//! Request pipeline: transcode, validate, overlay, export
//!
//! Each request runs the four steps start-to-finish with no internal
//! parallelism. The upload and the transcode intermediate are removed when
//! the request finishes, however it finishes; the export file is left on
//! disk for the caller.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::compositor::Compositor;
use crate::error::Result;
use crate::overlay;
use crate::probe::Prober;
use crate::transcode::Transcoder;

/// Removes the wrapped file when dropped, surviving every early return
struct TempGuard {
    path: PathBuf,
}

impl TempGuard {
    fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(err) = std::fs::remove_file(&self.path) {
                warn!("failed to remove {:?}: {err}", self.path);
            }
        }
    }
}

/// One request's worth of work: all four steps plus cleanup
pub struct Pipeline {
    transcoder: Transcoder,
    prober: Prober,
    compositor: Compositor,
    upload_dir: PathBuf,
    export_dir: PathBuf,
}

impl Pipeline {
    /// Build a pipeline rooted at the two working directories
    #[must_use]
    pub fn new(upload_dir: &Path, export_dir: &Path) -> Self {
        Self {
            transcoder: Transcoder::new(),
            prober: Prober::new(),
            compositor: Compositor::new(),
            upload_dir: upload_dir.to_path_buf(),
            export_dir: export_dir.to_path_buf(),
        }
    }

    /// Swap in a custom transcoder
    #[must_use]
    pub fn with_transcoder(mut self, transcoder: Transcoder) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Swap in a custom prober
    #[must_use]
    pub fn with_prober(mut self, prober: Prober) -> Self {
        self.prober = prober;
        self
    }

    /// Swap in a custom compositor
    #[must_use]
    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    /// Check that ffmpeg and ffprobe both respond
    pub async fn check_dependencies(&self) -> Vec<(String, bool)> {
        vec![
            ("ffmpeg".to_string(), self.transcoder.check_available().await),
            ("ffprobe".to_string(), self.prober.check_available().await),
        ]
    }

    /// Run the full pipeline for one saved upload.
    ///
    /// `upload` must already be on disk. It is deleted when this returns,
    /// along with the transcode intermediate; the returned export path is
    /// not.
    pub async fn process(
        &self,
        upload: &Path,
        script: &str,
        brand: &str,
        product: &str,
    ) -> Result<PathBuf> {
        let started = std::time::Instant::now();
        let _upload_guard = TempGuard::new(upload);

        info!("transcoding {:?}", upload);
        let converted = self.transcoder.normalize(upload, &self.upload_dir).await?;
        let _converted_guard = TempGuard::new(&converted);

        info!("validating {:?}", converted);
        let clip = self.prober.probe(&converted).await?;
        clip.validate()?;
        debug!("clip: {:.1}s {}x{}", clip.duration, clip.width, clip.height);

        let overlays = overlay::build_overlays(
            brand,
            product,
            script,
            clip.duration,
            self.compositor.output_height(),
        )?;

        info!("compositing {} overlays", overlays.len());
        let exported = self
            .compositor
            .export(&converted, &overlays, &self.export_dir)
            .await?;

        info!(
            "finished in {:.2}s: {:?}",
            started.elapsed().as_secs_f64(),
            exported
        );
        Ok(exported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::CompositorConfig;
    use crate::transcode::TranscoderConfig;

    #[test]
    fn test_temp_guard_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scratch.mp4");
        std::fs::write(&path, b"bytes").expect("write");

        {
            let _guard = TempGuard::new(&path);
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("never-created.mp4");

        // Dropping must not panic when there is nothing to remove
        let _guard = TempGuard::new(&path);
    }

    #[tokio::test]
    async fn test_failed_transcode_still_removes_upload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let upload = dir.path().join("upload.mp4");
        std::fs::write(&upload, b"not a real video").expect("write");

        let pipeline = Pipeline::new(dir.path(), dir.path()).with_transcoder(
            Transcoder::with_config(
                TranscoderConfig::default().with_ffmpeg_path("/nonexistent/ffmpeg"),
            ),
        );

        let result = pipeline.process(&upload, "line", "brand", "product").await;
        assert!(result.is_err());
        assert!(!upload.exists(), "upload must be cleaned up on failure");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_metadata_read_still_removes_intermediate() {
        use std::os::unix::fs::PermissionsExt;

        let tools = tempfile::tempdir().expect("tempdir");
        let work = tempfile::tempdir().expect("tempdir");

        // Stand-in encoder that succeeds and writes a non-empty output
        // file, so the pipeline reaches the metadata stage with a real
        // intermediate on disk
        let fake_ffmpeg = tools.path().join("ffmpeg");
        std::fs::write(
            &fake_ffmpeg,
            "#!/bin/sh\nfor arg in \"$@\"; do out=\"$arg\"; done\nprintf bytes > \"$out\"\n",
        )
        .expect("write stub");
        std::fs::set_permissions(&fake_ffmpeg, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");

        let upload = work.path().join("upload.mp4");
        std::fs::write(&upload, b"not a real video").expect("write");

        let pipeline = Pipeline::new(work.path(), work.path())
            .with_transcoder(Transcoder::with_config(
                TranscoderConfig::default().with_ffmpeg_path(&fake_ffmpeg.to_string_lossy()),
            ))
            .with_prober(Prober::with_path("/nonexistent/ffprobe"));

        let result = pipeline.process(&upload, "line", "brand", "product").await;
        assert!(result.is_err());
        assert!(!upload.exists(), "upload must be cleaned up on failure");

        let leftover: Vec<String> = std::fs::read_dir(work.path())
            .expect("read_dir")
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with("_converted_safe.mp4"))
            .collect();
        assert!(
            leftover.is_empty(),
            "intermediate must be cleaned up on failure: {leftover:?}"
        );
    }

    #[tokio::test]
    async fn test_check_dependencies_reports_both_tools() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = Pipeline::new(dir.path(), dir.path());

        let deps = pipeline.check_dependencies().await;
        let names: Vec<&str> = deps.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["ffmpeg", "ffprobe"]);
    }

    #[tokio::test]
    async fn test_check_dependencies_missing_tools() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = Pipeline::new(dir.path(), dir.path())
            .with_transcoder(Transcoder::with_config(
                TranscoderConfig::default().with_ffmpeg_path("/nonexistent/ffmpeg"),
            ))
            .with_prober(Prober::with_path("/nonexistent/ffprobe"))
            .with_compositor(Compositor::with_config(
                CompositorConfig::default().with_ffmpeg_path("/nonexistent/ffmpeg"),
            ));

        let deps = pipeline.check_dependencies().await;
        assert!(deps.iter().all(|(_, available)| !available));
    }
}
