//! Field geometry derived from label size.
//!
//! Everything scales with label height so the same request lays out
//! sensibly on 25 mm and 50 mm stock. At 300 DPI a 100 × 30 mm label
//! (1181 × 354 dots) gives:
//!
//! ```text
//! margin_y 22, number 44, name 59, secondary 39, barcode 88, gap 7
//! ```

use crate::printer::{LabelSize, PrinterConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelLayout {
    pub width: u32,
    pub height: u32,
    pub margin_x: u32,
    pub margin_y: u32,
    /// Item number font height (native font)
    pub number_font: u32,
    /// Primary display name font height
    pub name_font: u32,
    pub secondary_font: u32,
    pub barcode_height: u32,
    /// Narrow bar width in dots
    pub module_width: u32,
    /// Vertical gap between stacked fields
    pub gap: u32,
}

impl LabelLayout {
    pub fn compute(size: &LabelSize, printer: &PrinterConfig) -> Self {
        let (width, height) = size.to_dots(printer);

        Self {
            width,
            height,
            margin_x: (width / 30).max(8),
            margin_y: (height / 16).max(8),
            number_font: (height / 8).max(12),
            name_font: (height / 6).max(14),
            secondary_font: (height / 9).max(12),
            barcode_height: (height / 4).max(20),
            module_width: (width / 400).clamp(1, 4),
            gap: (height / 50).max(4),
        }
    }

    /// Horizontal room between the margins.
    pub fn content_width(&self) -> u32 {
        self.width.saturating_sub(self.margin_x * 2).max(1)
    }
}
