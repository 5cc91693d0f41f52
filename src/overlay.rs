//! Text overlay descriptors and drawtext generation
//!
//! Every export carries three kinds of overlays: a brand banner, a product
//! banner, and one caption slice per script line. All of them render white
//! text on a 60% opacity black box, centered horizontally; only font size,
//! vertical offset, and timing differ between the kinds.

use crate::error::{PipelineError, Result};

/// Font face used for every overlay, resolved through fontconfig
pub const OVERLAY_FONT: &str = "NanumGothic";
/// Brand banner font size
pub const BRAND_FONT_SIZE: u32 = 60;
/// Product banner font size
pub const PRODUCT_FONT_SIZE: u32 = 80;
/// Caption font size
pub const CAPTION_FONT_SIZE: u32 = 60;
/// Brand banner offset from the top of the frame, pixels
pub const BRAND_Y: u32 = 140;
/// Product banner offset from the top of the frame, pixels
pub const PRODUCT_Y: u32 = 240;
/// Captions sit this many pixels above the bottom edge reference point
pub const CAPTION_BOTTOM_OFFSET: u32 = 500;
/// Longest a single caption slice stays on screen, seconds
pub const MAX_CAPTION_WINDOW_SECS: f64 = 3.0;

/// Style shared by all overlay kinds
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Font face name
    pub font: String,
    /// Font size in points
    pub font_size: u32,
    /// Text color (hex: RRGGBB)
    pub color: String,
    /// Box color behind the text (hex: RRGGBB)
    pub background_color: String,
    /// Box opacity (0.0 - 1.0)
    pub background_opacity: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font: OVERLAY_FONT.to_string(),
            font_size: CAPTION_FONT_SIZE,
            color: "FFFFFF".to_string(),
            background_color: "000000".to_string(),
            background_opacity: 0.6,
        }
    }
}

impl OverlayStyle {
    /// Style for the brand banner
    #[must_use]
    pub fn brand() -> Self {
        Self {
            font_size: BRAND_FONT_SIZE,
            ..Default::default()
        }
    }

    /// Style for the product banner
    #[must_use]
    pub fn product() -> Self {
        Self {
            font_size: PRODUCT_FONT_SIZE,
            ..Default::default()
        }
    }

    /// Style for caption slices
    #[must_use]
    pub fn caption() -> Self {
        Self::default()
    }
}

/// A single text overlay with timing and placement
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Text content
    pub text: String,
    /// Style (face, size, colors)
    pub style: OverlayStyle,
    /// Vertical position as a drawtext expression; horizontal is always centered
    pub y: String,
    /// Seconds from clip start
    pub start: f64,
    /// Seconds on screen
    pub duration: f64,
}

impl Overlay {
    /// End of the visibility window, seconds from clip start
    #[must_use]
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Render as one drawtext filter
    #[must_use]
    pub fn to_drawtext(&self) -> String {
        format!(
            "drawtext=text={text}:font={font}:fontsize={fontsize}:fontcolor=0x{color}:\
             x=(w-text_w)/2:y={y}:box=1:boxcolor=0x{bg}@{opacity}:boxborderw=5:\
             enable='between(t,{start},{end})'",
            text = escape_drawtext(&self.text),
            font = self.style.font,
            fontsize = self.style.font_size,
            color = self.style.color,
            y = self.y,
            bg = self.style.background_color,
            opacity = self.style.background_opacity,
            start = self.start,
            end = self.end(),
        )
    }
}

/// Escape text for the drawtext filter grammar.
///
/// The rendered value passes through two tokenizers: the filtergraph parser
/// (backslash escapes, `'` quoting, and the `[ ] , ;` chain separators),
/// then the option-value parser (backslash escapes, `'` quoting, and the
/// `:` separator). Nothing is escapable inside a quoted span, so a quote in
/// the text would end the quoting early and leak the rest of the value;
/// each special character is instead backslash-escaped once per level that
/// treats it specially, and the value stays unquoted. Line breaks cannot
/// survive either tokenizer and fold to a space.
fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            // special for both tokenizers
            '\\' => escaped.push_str("\\\\\\\\"),
            '\'' => escaped.push_str("\\\\\\'"),
            // option-value separator
            ':' => escaped.push_str("\\\\:"),
            // filtergraph chain separators
            ',' => escaped.push_str("\\,"),
            ';' => escaped.push_str("\\;"),
            '[' => escaped.push_str("\\["),
            ']' => escaped.push_str("\\]"),
            '\n' => escaped.push(' '),
            '\r' => {}
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Brand banner: one full-duration line near the top of the frame
#[must_use]
pub fn brand_banner(text: &str, clip_duration: f64) -> Overlay {
    Overlay {
        text: text.to_string(),
        style: OverlayStyle::brand(),
        y: BRAND_Y.to_string(),
        start: 0.0,
        duration: clip_duration,
    }
}

/// Product banner: one full-duration line below the brand banner
#[must_use]
pub fn product_banner(text: &str, clip_duration: f64) -> Overlay {
    Overlay {
        text: text.to_string(),
        style: OverlayStyle::product(),
        y: PRODUCT_Y.to_string(),
        start: 0.0,
        duration: clip_duration,
    }
}

/// Slice a caption script into sequential fixed-length windows.
///
/// The script is trimmed and split on line breaks; interior empty lines
/// become blank (but still timed) slices. Every slice shows for
/// `min(3, duration / line_count)` seconds, so a short script leaves the
/// tail of the clip uncaptioned rather than stretching the last line.
/// An empty script is rejected before any window arithmetic.
pub fn caption_slices(
    script: &str,
    clip_duration: f64,
    frame_height: u32,
) -> Result<Vec<Overlay>> {
    let trimmed = script.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::EmptyScript);
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    let window = MAX_CAPTION_WINDOW_SECS.min(clip_duration / lines.len() as f64);
    let y = frame_height.saturating_sub(CAPTION_BOTTOM_OFFSET).to_string();

    Ok(lines
        .iter()
        .enumerate()
        .map(|(i, line)| Overlay {
            text: (*line).to_string(),
            style: OverlayStyle::caption(),
            y: y.clone(),
            start: i as f64 * window,
            duration: window,
        })
        .collect())
}

/// All overlays for one export, in paint order: brand, product, then captions
pub fn build_overlays(
    brand: &str,
    product: &str,
    script: &str,
    clip_duration: f64,
    frame_height: u32,
) -> Result<Vec<Overlay>> {
    let mut overlays = vec![
        brand_banner(brand, clip_duration),
        product_banner(product, clip_duration),
    ];
    overlays.extend(caption_slices(script, clip_duration, frame_height)?);
    Ok(overlays)
}
