//! `Reelmark` - burn brand banners and timed captions into vertical videos
//!
//! # Features
//!
//! - **Normalization**: every upload is forced through ffmpeg into
//!   H.264/yuv420p + AAC mp4 before anything else touches it
//! - **Validation**: ffprobe-backed duration (10-120s) and portrait-only
//!   checks
//! - **Overlays**: a brand banner, a product banner, and per-line caption
//!   slices with 3-second windows
//! - **Export**: a single ffmpeg pass that scales to a 1920-high frame and
//!   burns every overlay in as a drawtext filter
//!
//! # Example
//!
//! ```rust,no_run
//! use reelmark::Pipeline;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::new(Path::new("uploads"), Path::new("exports"));
//!     let exported = pipeline
//!         .process(Path::new("uploads/clip.mp4"), "Hello\nWorld", "Acme", "Widget")
//!         .await?;
//!     println!("wrote {}", exported.display());
//!     Ok(())
//! }
//! ```

pub mod compositor;
pub mod config;
pub mod error;
pub mod overlay;
pub mod pipeline;
pub mod probe;
pub mod server;
pub mod transcode;

pub use compositor::{Compositor, CompositorConfig};
pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use overlay::{Overlay, OverlayStyle};
pub use pipeline::Pipeline;
pub use probe::{ClipInfo, Prober};
pub use transcode::{Transcoder, TranscoderConfig};

/// Version of reelmark
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
