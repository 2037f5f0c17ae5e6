//! # Text Rasterization
//!
//! Label printers ship with Latin fonts only. Thai (and any other script the
//! printer cannot draw) is rendered here with a TrueType font into a
//! 1-bit bitmap and sent as a `^GFA` graphic field.
//!
//! ## Pipeline
//!
//! ```text
//! text ──► measure (advances + kerning) ──► clamp to max width
//!      ──► draw on white canvas (black glyphs, vertically centered)
//!      ──► threshold: luminance < 128 → 1
//!      ──► pack MSB-first, rows padded to whole bytes
//! ```
//!
//! ## Bit Packing
//!
//! Same layout `^GFA` expects:
//! - Bit 7 (MSB) = leftmost dot
//! - 1 = black (print), 0 = white
//! - `bytes_per_row = ceil(width / 8)`, `data.len() = bytes_per_row * height`

use ab_glyph::{Font, FontArc, ScaleFont, point};
use image::{GrayImage, Luma};
use std::path::Path;
use std::sync::Arc;

use crate::error::{EncodingError, TagpressError, TagpressResult};
use crate::protocol::zpl;

/// Luminance below this prints as black
pub const LUMA_THRESHOLD: u8 = 128;

/// Line box height relative to the font size
const LINE_BOX_SCALE: f32 = 1.2;

/// Fonts probed by [`Typeface::discover`].
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/noto/NotoSansThai-Regular.ttf",
    "/usr/share/fonts/noto/NotoSansThai-Regular.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansThai-Regular.ttf",
    "/usr/share/fonts/truetype/tlwg/Garuda.ttf",
    "/usr/share/fonts/truetype/tlwg/Loma.ttf",
    "/usr/share/fonts/truetype/thai/Garuda.ttf",
    "/Library/Fonts/Thonburi.ttf",
    "/System/Library/Fonts/Thonburi.ttc",
    "C:\\Windows\\Fonts\\tahoma.ttf",
];

/// A font without this glyph cannot draw Thai labels
const THAI_PROBE: char = 'ก';

// ============================================================================
// TYPEFACE
// ============================================================================

/// A loaded TrueType/OpenType font. Cheap to clone.
#[derive(Clone)]
pub struct Typeface {
    font: FontArc,
    source: Arc<str>,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typeface").field("source", &self.source).finish()
    }
}

impl Typeface {
    pub fn from_bytes(data: Vec<u8>, source: &str) -> TagpressResult<Self> {
        let font = FontArc::try_from_vec(data)
            .map_err(|e| TagpressError::InvalidConfig(format!("invalid font {}: {}", source, e)))?;
        Ok(Self {
            font,
            source: Arc::from(source),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> TagpressResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            TagpressError::InvalidConfig(format!("cannot read font {}: {}", path.display(), e))
        })?;
        Self::from_bytes(data, &path.display().to_string())
    }

    /// First loadable font from [`SYSTEM_FONT_PATHS`] that covers Thai.
    pub fn discover() -> Option<Self> {
        Self::first_thai_capable(SYSTEM_FONT_PATHS)
    }

    fn first_thai_capable(paths: &[&str]) -> Option<Self> {
        paths
            .iter()
            .filter(|p| Path::new(p).exists())
            .filter_map(|p| Self::from_file(p).ok())
            .find(Self::covers_thai)
    }

    /// Whether the font maps `ch` to a real glyph rather than `.notdef`.
    pub fn covers(&self, ch: char) -> bool {
        self.font.glyph_id(ch).0 != 0
    }

    pub fn covers_thai(&self) -> bool {
        self.covers(THAI_PROBE)
    }

    /// Where the font was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render `text` to a packed 1-bit bitmap.
    ///
    /// The bitmap is as wide as the rendered text, clamped to
    /// `max_width_px`, and `1.2 × font_size_px` tall with the text
    /// vertically centered.
    ///
    /// ## Errors
    ///
    /// - `InvalidInput`: empty text or a non-positive font size
    /// - `MissingGlyphs`: a character the font would draw as `.notdef`
    pub fn rasterize(
        &self,
        text: &str,
        font_size_px: f32,
        max_width_px: u32,
    ) -> Result<RasterGlyphBitmap, EncodingError> {
        if text.trim().is_empty() {
            return Err(EncodingError::InvalidInput("cannot rasterize empty text".into()));
        }
        if !(font_size_px.is_finite() && font_size_px > 0.0) {
            return Err(EncodingError::InvalidInput(format!(
                "font size must be positive, got {}",
                font_size_px
            )));
        }
        if max_width_px == 0 {
            return Err(EncodingError::InvalidInput("max width must be positive".into()));
        }

        let missing: String = text
            .chars()
            .filter(|c| !c.is_control() && !self.covers(*c))
            .collect();
        if !missing.is_empty() {
            return Err(EncodingError::MissingGlyphs {
                typeface: self.source.to_string(),
                missing,
            });
        }

        let font = &self.font;
        let scaled = font.as_scaled(font_size_px);

        // Layout: advances plus pair kerning, no OpenType shaping. Thai
        // combining marks have zero advance and land wherever the font's
        // default mark position puts them, so a tone mark over an upper
        // vowel (e.g. "กี่") can overlap it, as can marks on tall
        // consonants such as ป ฝ ฟ. Fonts that rely on GPOS mark-to-mark
        // positioning for stacking render those clusters cramped.
        let mut glyphs = Vec::new();
        let mut caret_x = 0.0f32;
        let mut previous = None;

        for ch in text.chars().filter(|c| !c.is_control()) {
            let glyph_id = font.glyph_id(ch);
            if let Some(prev) = previous {
                caret_x += scaled.kern(prev, glyph_id);
            }
            glyphs.push((glyph_id, caret_x));
            caret_x += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);
        }

        let ascent = scaled.ascent();
        let descent = scaled.descent();
        let height = (font_size_px * LINE_BOX_SCALE)
            .max(ascent - descent)
            .ceil() as u32;
        let baseline_y = ((height as f32 - (ascent - descent)) / 2.0 + ascent).round();

        let outlined: Vec<_> = glyphs
            .iter()
            .filter_map(|&(glyph_id, glyph_x)| {
                font.outline_glyph(
                    glyph_id.with_scale_and_position(font_size_px, point(glyph_x, baseline_y)),
                )
            })
            .collect();

        // Measured width covers both advances and ink that overhangs them
        let ink_right = outlined
            .iter()
            .map(|g| g.px_bounds().max.x)
            .fold(caret_x, f32::max);
        let width = (ink_right.ceil().max(1.0) as u32).min(max_width_px);

        let mut canvas = GrayImage::from_pixel(width, height, Luma([255u8]));

        for glyph in &outlined {
            let bounds = glyph.px_bounds();
            glyph.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;

                if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                    let ink = 255.0 - coverage.clamp(0.0, 1.0) * 255.0;
                    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                    // Overlapping glyphs (Thai marks) keep the darker value
                    pixel[0] = pixel[0].min(ink.round() as u8);
                }
            });
        }

        Ok(RasterGlyphBitmap::from_luma(&canvas))
    }
}

// ============================================================================
// BITMAP
// ============================================================================

/// Packed 1-bit bitmap, row-major, MSB = leftmost pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterGlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: usize,
    pub data: Vec<u8>,
}

impl RasterGlyphBitmap {
    /// Threshold a grayscale image and pack it.
    pub fn from_luma(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let bytes_per_row = (width as usize).div_ceil(8);
        let mut data = vec![0u8; bytes_per_row * height as usize];

        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel[0] < LUMA_THRESHOLD {
                let idx = y as usize * bytes_per_row + x as usize / 8;
                data[idx] |= 0x80 >> (x % 8);
            }
        }

        Self {
            width,
            height,
            bytes_per_row,
            data,
        }
    }

    /// Whether the pixel at (x, y) is black.
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.bytes_per_row + x as usize / 8;
        self.data[idx] & (0x80 >> (x % 8)) != 0
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn ink_count(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// `^FOx,y^GFA,...^FS` placing this bitmap on a label.
    pub fn to_gfa(&self, x: u32, y: u32) -> String {
        zpl::graphic_field(x, y, self.bytes_per_row, &self.data)
    }

    /// Expand back to a grayscale image (black = 0, white = 255).
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.is_set(x, y) { Luma([0u8]) } else { Luma([255u8]) }
        })
    }

    /// Save as PNG for visual inspection.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> TagpressResult<()> {
        let path = path.as_ref();
        self.to_luma().save(path).map_err(|e| {
            TagpressError::Io(std::io::Error::other(format!(
                "failed to save PNG {}: {}",
                path.display(),
                e
            )))
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

/// Fixture font covering ASCII and the Thai block. Glyphs are plain boxes,
/// Thai marks have zero advance.
#[cfg(test)]
pub(crate) const THAI_TEST_FONT: &[u8] = include_bytes!("../../tests/fixtures/thai-test.ttf");

/// Same shapes as [`THAI_TEST_FONT`], ASCII only.
#[cfg(test)]
pub(crate) const LATIN_TEST_FONT: &[u8] = include_bytes!("../../tests/fixtures/latin-test.ttf");

#[cfg(test)]
pub(crate) fn test_typeface() -> Typeface {
    Typeface::from_bytes(THAI_TEST_FONT.to_vec(), "thai-test.ttf").unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latin_only() -> Typeface {
        Typeface::from_bytes(LATIN_TEST_FONT.to_vec(), "latin-test.ttf").unwrap()
    }

    #[test]
    fn test_pack_msb_first() {
        // 10 pixels wide: two bytes per row, second byte only uses 2 bits
        let mut img = GrayImage::from_pixel(10, 2, Luma([255u8]));
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(9, 0, Luma([10]));
        img.put_pixel(1, 1, Luma([127]));
        img.put_pixel(2, 1, Luma([128])); // exactly at threshold stays white

        let bitmap = RasterGlyphBitmap::from_luma(&img);
        assert_eq!(bitmap.bytes_per_row, 2);
        assert_eq!(bitmap.data, vec![0x80, 0x40, 0x40, 0x00]);
        assert!(bitmap.is_set(9, 0));
        assert!(!bitmap.is_set(2, 1));
    }

    #[test]
    fn test_byte_length_invariant() {
        for (w, h) in [(1, 1), (7, 3), (8, 5), (9, 2), (250, 37)] {
            let bitmap = RasterGlyphBitmap::from_luma(&GrayImage::new(w, h));
            assert_eq!(bitmap.byte_len(), (w as usize).div_ceil(8) * h as usize);
        }
    }

    #[test]
    fn test_to_gfa() {
        let mut img = GrayImage::from_pixel(8, 1, Luma([255u8]));
        img.put_pixel(7, 0, Luma([0]));
        let bitmap = RasterGlyphBitmap::from_luma(&img);
        assert_eq!(bitmap.to_gfa(5, 6), "^FO5,6^GFA,1,1,1,01^FS");
    }

    #[test]
    fn test_luma_round_trip_preserves_pixels() {
        let mut img = GrayImage::from_pixel(12, 3, Luma([255u8]));
        img.put_pixel(3, 1, Luma([0]));
        img.put_pixel(11, 2, Luma([0]));
        let bitmap = RasterGlyphBitmap::from_luma(&img);
        assert_eq!(RasterGlyphBitmap::from_luma(&bitmap.to_luma()), bitmap);
    }

    #[test]
    fn test_rasterize_thai_text() {
        let bitmap = test_typeface().rasterize("โต๊ะทำงาน", 48.0, 1000).unwrap();
        assert!(bitmap.width > 0);
        assert_eq!(bitmap.height, 58);
        assert_eq!(
            bitmap.byte_len(),
            (bitmap.width as usize).div_ceil(8) * bitmap.height as usize
        );
        assert!(bitmap.ink_count() > 0);
    }

    #[test]
    fn test_rasterize_deterministic() {
        let face = test_typeface();
        let a = face.rasterize("โต๊ะทำงาน FG-001", 40.0, 800).unwrap();
        let b = face.rasterize("โต๊ะทำงาน FG-001", 40.0, 800).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_combining_mark_adds_ink_not_width() {
        let face = test_typeface();
        let base = face.rasterize("ก", 48.0, 1000).unwrap();
        let marked = face.rasterize("กิ", 48.0, 1000).unwrap();
        assert_eq!(marked.width, base.width);
        assert!(marked.ink_count() > base.ink_count());
    }

    #[test]
    fn test_rasterize_clamps_width() {
        let face = test_typeface();
        let wide = face.rasterize("Wide text that keeps going", 64.0, 10_000).unwrap();
        let clamped = face.rasterize("Wide text that keeps going", 64.0, 100).unwrap();
        assert!(wide.width > 100);
        assert_eq!(clamped.width, 100);
        assert_eq!(clamped.bytes_per_row, 13);
    }

    #[test]
    fn test_rasterize_rejects_empty() {
        let face = test_typeface();
        assert!(matches!(
            face.rasterize("   ", 24.0, 100),
            Err(EncodingError::InvalidInput(_))
        ));
        assert!(face.rasterize("x", 0.0, 100).is_err());
    }

    #[test]
    fn test_font_without_thai_is_rejected() {
        let face = latin_only();
        assert!(!face.covers_thai());
        assert!(face.rasterize("FG-001", 48.0, 1000).is_ok());

        match face.rasterize("Desk โต๊ะ", 48.0, 1000) {
            Err(EncodingError::MissingGlyphs { typeface, missing }) => {
                assert_eq!(typeface, "latin-test.ttf");
                assert_eq!(missing, "โต๊ะ");
            }
            other => panic!("expected MissingGlyphs, got {:?}", other),
        }
    }

    #[test]
    fn test_uncovered_script_is_rejected() {
        assert!(matches!(
            test_typeface().rasterize("机器", 48.0, 1000),
            Err(EncodingError::MissingGlyphs { .. })
        ));
    }

    #[test]
    fn test_discovery_skips_fonts_without_thai() {
        let latin = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/latin-test.ttf");
        let thai = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/thai-test.ttf");

        let found = Typeface::first_thai_capable(&["/nonexistent/font.ttf", latin, thai]).unwrap();
        assert_eq!(found.source(), thai);
        assert!(Typeface::first_thai_capable(&[latin]).is_none());
    }
}
