//! # Rendering Module
//!
//! This module turns text the printer cannot draw into label graphics.
//!
//! ## Modules
//!
//! - [`raster`]: TrueType text to 1-bit bitmap, packed for `^GFA`
//!
//! ## Usage Example
//!
//! ```no_run
//! use tagpress::render::raster::Typeface;
//!
//! let face = Typeface::from_file("/usr/share/fonts/truetype/tlwg/Garuda.ttf")?;
//! let bitmap = face.rasterize("โต๊ะทำงาน", 48.0, 1000)?;
//!
//! // ^FO40,80^GFA,...^FS, ready to place on a label
//! let field = bitmap.to_gfa(40, 80);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod raster;

pub use raster::{RasterGlyphBitmap, Typeface};
