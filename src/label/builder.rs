//! # ZPL Label Builder
//!
//! Turns a [`LabelRequest`] into one or more complete ZPL formats.
//!
//! ## Field Order
//!
//! ```text
//! ^XA ^CI28 ^PW ^LL ^LH        header
//! item number                  native font
//! display name                 native font, or ^GFA when not Latin
//! secondary name (optional)    same rule
//! QTY line (packing slip)
//! ^BY ^BCN                     Code 128 of the barcode payload
//! ^RS8 ^RFW,H                  EPC write (RFID only)
//! ^PQ ^XZ
//! ```
//!
//! ## Copies and RFID
//!
//! `^PQn` makes the printer repeat a format verbatim, EPC included. When
//! RFID is on, the builder instead emits `quantity` formats with `^PQ1`,
//! each carrying the EPC for its own sequence index.
//!
//! Building is pure: no I/O, no clock, no randomness. The same inputs give
//! byte-identical output, which is what previews and tests rely on.

use barcoders::sym::code128::Code128;
use serde::Serialize;
use tracing::{info, warn};

use super::{LabelLayout, LabelRequest, LabelType};
use crate::epc::{self, EpcConfig};
use crate::error::{EncodingError, TagpressError, TagpressResult};
use crate::printer::{LabelSize, PrinterConfig, PrinterSettings};
use crate::protocol::zpl::{self, LINE_END};
use crate::render::raster::Typeface;

/// Code 128 character set B prefix understood by `barcoders`
const CODE128_SET_B: char = '\u{0181}';

/// One complete `^XA...^XZ` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZplDocument {
    pub zpl: String,
    /// EPC written by this format, if RFID is on
    pub epc: Option<String>,
    /// Physical labels this format produces (`^PQ`)
    pub copies: u32,
}

/// Everything needed to print one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelJob {
    pub item_number: String,
    pub label_type: LabelType,
    pub documents: Vec<ZplDocument>,
}

impl LabelJob {
    /// All formats concatenated, for previews and dry runs.
    pub fn to_zpl(&self) -> String {
        self.documents.iter().map(|d| d.zpl.as_str()).collect()
    }

    pub fn label_count(&self) -> u32 {
        self.documents.iter().map(|d| d.copies).sum()
    }

    pub fn epcs(&self) -> Vec<String> {
        self.documents.iter().filter_map(|d| d.epc.clone()).collect()
    }

    pub fn has_rfid(&self) -> bool {
        self.documents.iter().any(|d| d.epc.is_some())
    }
}

/// Builds ZPL for a given printer resolution.
#[derive(Debug, Clone, Default)]
pub struct LabelBuilder {
    printer: PrinterConfig,
    typeface: Option<Typeface>,
}

impl LabelBuilder {
    pub fn new(printer: PrinterConfig) -> Self {
        Self {
            printer,
            typeface: None,
        }
    }

    /// Builder for the configured DPI, with the configured font or, when
    /// none is set, the first system font that covers Thai. Without one,
    /// labels with Thai text fail individually.
    pub fn from_settings(settings: &PrinterSettings) -> TagpressResult<Self> {
        let builder = Self::new(settings.printer()?);
        let typeface = match settings.font_path.as_deref() {
            Some(path) => Some(Typeface::from_file(path)?),
            None => Typeface::discover(),
        };
        Ok(match typeface {
            Some(face) => {
                if face.covers_thai() {
                    info!(font = face.source(), "rasterizing non-Latin text");
                } else {
                    warn!(font = face.source(), "font has no Thai glyphs; Thai labels will fail");
                }
                builder.with_typeface(face)
            }
            None => {
                warn!("no Thai-capable font found; labels with non-Latin text will fail");
                builder
            }
        })
    }

    /// Font used for text the printer cannot draw natively.
    pub fn with_typeface(mut self, typeface: Typeface) -> Self {
        self.typeface = Some(typeface);
        self
    }

    pub fn printer(&self) -> &PrinterConfig {
        &self.printer
    }

    pub fn typeface(&self) -> Option<&Typeface> {
        self.typeface.as_ref()
    }

    /// Build the ZPL for `request` on `size` stock.
    ///
    /// ## Errors
    ///
    /// - `InvalidRequest`: missing item number, zero quantity
    /// - `InvalidConfig`: bad label size, RFID requested without EPC config
    /// - `Encoding`: unencodable barcode, EPC overflow, non-Latin text
    ///   without a typeface
    pub fn build(
        &self,
        request: &LabelRequest,
        size: &LabelSize,
        epc_config: Option<&EpcConfig>,
    ) -> TagpressResult<LabelJob> {
        request.validate()?;
        size.validate()?;

        let rfid_config = if request.rfid_enabled() {
            let config = epc_config.ok_or_else(|| {
                TagpressError::InvalidConfig(format!(
                    "RFID requested for {} but no EPC config is set",
                    request.number
                ))
            })?;
            config.validate()?;
            Some(config)
        } else {
            None
        };

        let layout = LabelLayout::compute(size, &self.printer);
        let header = header_lines(&layout);
        let body = self.body_lines(request, &layout)?;

        let item_number = request.number.trim();
        let documents = match rfid_config {
            Some(config) => (1..=request.quantity)
                .map(|seq| -> TagpressResult<ZplDocument> {
                    let epc = epc::encode(item_number, seq, request.quantity, config)?;
                    let rfid = [zpl::rfid_setup().to_string(), zpl::rfid_write_epc(&epc)];
                    Ok(ZplDocument {
                        zpl: assemble(&header, &body, &rfid, 1),
                        epc: Some(epc),
                        copies: 1,
                    })
                })
                .collect::<TagpressResult<Vec<_>>>()?,
            None => {
                // A packing slip states the quantity instead of repeating
                let copies = match request.label_type {
                    LabelType::PackingSlip => 1,
                    _ => request.quantity,
                };
                vec![ZplDocument {
                    zpl: assemble(&header, &body, &[], copies),
                    epc: None,
                    copies,
                }]
            }
        };

        Ok(LabelJob {
            item_number: item_number.to_string(),
            label_type: request.label_type,
            documents,
        })
    }

    fn body_lines(&self, request: &LabelRequest, layout: &LabelLayout) -> TagpressResult<Vec<String>> {
        let mut lines = Vec::new();
        let x = layout.margin_x;
        let mut y = layout.margin_y;

        let number_font = match request.label_type {
            LabelType::PackingSlip => layout.name_font,
            _ => layout.number_font,
        };
        y += self.push_text(&mut lines, x, y, number_font, request.number.trim(), layout)?
            + layout.gap;

        let name = request.display_name.trim();
        if !name.is_empty() {
            y += self.push_text(&mut lines, x, y, layout.name_font, name, layout)? + layout.gap;
        }

        if let Some(secondary) = request.secondary_name.as_deref().map(str::trim)
            && !secondary.is_empty()
        {
            y += self.push_text(&mut lines, x, y, layout.secondary_font, secondary, layout)?
                + layout.gap;
        }

        if request.label_type == LabelType::PackingSlip {
            let qty = format!("QTY: {}", request.quantity);
            y += self.push_text(&mut lines, x, y, layout.number_font, &qty, layout)? + layout.gap;
        }

        let payload = request.barcode_payload();
        let modules = code128_modules(payload)?;
        // Narrow the bars rather than run off the label
        let module_width = layout
            .module_width
            .min((layout.content_width() / modules.max(1)).max(1));

        lines.push(zpl::barcode_defaults(module_width, layout.barcode_height));
        lines.push(zpl::code128(x, y, layout.barcode_height, payload, true));

        Ok(lines)
    }

    /// Emit a text field, rasterized when the printer font cannot draw it.
    /// Returns the height used.
    fn push_text(
        &self,
        lines: &mut Vec<String>,
        x: u32,
        y: u32,
        font_height: u32,
        text: &str,
        layout: &LabelLayout,
    ) -> TagpressResult<u32> {
        if text.is_ascii() {
            lines.push(zpl::text_field(x, y, font_height, text));
            return Ok(font_height);
        }

        let typeface = self
            .typeface
            .as_ref()
            .ok_or_else(|| EncodingError::MissingTypeface(text.to_string()))?;
        let bitmap = typeface.rasterize(text, font_height as f32, layout.content_width())?;
        lines.push(bitmap.to_gfa(x, y));
        Ok(bitmap.height)
    }
}

fn header_lines(layout: &LabelLayout) -> Vec<String> {
    vec![
        zpl::start_format().to_string(),
        zpl::utf8_encoding().to_string(),
        zpl::print_width(layout.width),
        zpl::label_length(layout.height),
        zpl::label_home(0, 0),
    ]
}

fn assemble(header: &[String], body: &[String], rfid: &[String], copies: u32) -> String {
    let quantity = zpl::print_quantity(copies);
    header
        .iter()
        .chain(body)
        .chain(rfid)
        .map(String::as_str)
        .chain([quantity.as_str(), zpl::end_format()])
        .flat_map(|line| [line, LINE_END])
        .collect()
}

/// Module count of the Code 128 rendering, rejecting unencodable payloads.
fn code128_modules(payload: &str) -> Result<u32, EncodingError> {
    if payload.is_empty() {
        return Err(EncodingError::UnencodableBarcode(String::new()));
    }
    let barcode = Code128::new(format!("{}{}", CODE128_SET_B, payload))
        .map_err(|_| EncodingError::UnencodableBarcode(payload.to_string()))?;
    Ok(barcode.encode().len() as u32)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::raster::{LATIN_TEST_FONT, test_typeface};

    fn builder() -> LabelBuilder {
        LabelBuilder::new(PrinterConfig::DPI_300)
    }

    fn size() -> LabelSize {
        LabelSize::new(100.0, 30.0).unwrap()
    }

    #[test]
    fn test_barcode_label_structure() {
        let req = LabelRequest::new("FG-001", "Office Desk");
        let job = builder().build(&req, &size(), None).unwrap();

        assert_eq!(job.documents.len(), 1);
        let zpl = &job.documents[0].zpl;
        assert!(zpl.starts_with("^XA\n^CI28\n^PW1181\n^LL354\n"));
        assert!(zpl.contains("^FO39,22^A0N,44,44^FDFG-001^FS"));
        assert!(zpl.contains("^FO39,73^A0N,59,59^FDOffice Desk^FS"));
        assert!(zpl.contains("^BCN,88,Y,N,N,A^FDFG-001^FS"));
        assert!(zpl.ends_with("^PQ1\n^XZ\n"));
        assert!(!zpl.contains("^RFW"));
        assert!(!zpl.contains("^GFA"));
    }

    #[test]
    fn test_builder_is_pure() {
        let req = LabelRequest::new("FG-001", "Office Desk").secondary_name("Oak").quantity(3);
        let a = builder().build(&req, &size(), None).unwrap();
        let b = builder().build(&req, &size(), None).unwrap();
        assert_eq!(a.to_zpl(), b.to_zpl());
    }

    #[test]
    fn test_quantity_without_rfid_uses_print_quantity() {
        let req = LabelRequest::new("FG-001", "Desk").quantity(4);
        let job = builder().build(&req, &size(), None).unwrap();
        assert_eq!(job.documents.len(), 1);
        assert!(job.documents[0].zpl.contains("^PQ4\n"));
        assert_eq!(job.label_count(), 4);
    }

    #[test]
    fn test_rfid_quantity_emits_distinct_formats() {
        let req = LabelRequest::new("FG-001", "Desk").quantity(5).rfid(true);
        let config = EpcConfig::default();
        let job = builder().build(&req, &size(), Some(&config)).unwrap();

        assert_eq!(job.documents.len(), 5);
        assert_eq!(job.label_count(), 5);
        let epcs = job.epcs();
        for (i, doc) in job.documents.iter().enumerate() {
            assert!(doc.zpl.contains("^PQ1\n"));
            let epc = doc.epc.as_deref().unwrap();
            assert!(doc.zpl.contains(&format!("^RS8\n^RFW,H^FD{}^FS\n", epc)));
            assert_eq!(epc, epc::encode("FG-001", i as u32 + 1, 5, &config).unwrap());
        }
        let unique: std::collections::HashSet<_> = epcs.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_rfid_block_follows_barcode() {
        let req = LabelRequest::new("FG-001", "Desk").rfid(true);
        let job = builder().build(&req, &size(), Some(&EpcConfig::default())).unwrap();
        let zpl = &job.documents[0].zpl;
        assert!(zpl.find("^BCN").unwrap() < zpl.find("^RFW").unwrap());
    }

    #[test]
    fn test_rfid_without_config_rejected() {
        let req = LabelRequest::new("FG-001", "Desk").label_type(LabelType::ThaiRfid);
        let err = builder().build(&req, &size(), None).unwrap_err();
        assert!(matches!(err, TagpressError::InvalidConfig(_)));
    }

    #[test]
    fn test_packing_slip_states_quantity() {
        let req = LabelRequest::new("FG-001", "Desk")
            .label_type(LabelType::PackingSlip)
            .quantity(12)
            .rfid(true);
        let job = builder().build(&req, &size(), None).unwrap();
        assert_eq!(job.documents.len(), 1);
        let zpl = &job.documents[0].zpl;
        assert!(zpl.contains("^FDQTY: 12^FS"));
        assert!(zpl.contains("^PQ1\n"));
        assert!(!zpl.contains("^RFW"));
    }

    #[test]
    fn test_non_latin_without_typeface_fails_fast() {
        let req = LabelRequest::new("FG-001", "โต๊ะทำงาน").label_type(LabelType::Thai);
        let err = builder().build(&req, &size(), None).unwrap_err();
        assert!(matches!(
            err,
            TagpressError::Encoding(EncodingError::MissingTypeface(_))
        ));
    }

    #[test]
    fn test_unencodable_barcode() {
        let req = LabelRequest::new("FG-001", "Desk").barcode("รหัส");
        let err = builder().build(&req, &size(), None).unwrap_err();
        assert!(matches!(
            err,
            TagpressError::Encoding(EncodingError::UnencodableBarcode(_))
        ));
    }

    #[test]
    fn test_reserved_characters_escaped() {
        let req = LabelRequest::new("FG-001", "Desk ^XZ~JR");
        let job = builder().build(&req, &size(), None).unwrap();
        assert!(job.documents[0].zpl.contains("^FH_^FDDesk _5EXZ_7EJR^FS"));
    }

    #[test]
    fn test_thai_label_rasterizes_name() {
        let req = LabelRequest::new("FG-001", "โต๊ะทำงาน").label_type(LabelType::Thai);
        let job = builder()
            .with_typeface(test_typeface())
            .build(&req, &size(), None)
            .unwrap();

        let zpl = job.to_zpl();
        assert!(zpl.contains("^GFA,"));
        assert!(zpl.contains("^BCN,88,Y,N,N,A^FDFG-001^FS"));
        assert!(!zpl.contains("^RFW"));
        assert!(!zpl.contains("^RS8"));
    }

    #[test]
    fn test_thai_label_with_latin_font_fails_fast() {
        let latin = Typeface::from_bytes(LATIN_TEST_FONT.to_vec(), "latin-test.ttf").unwrap();
        let req = LabelRequest::new("FG-001", "โต๊ะทำงาน").label_type(LabelType::Thai);
        let err = builder()
            .with_typeface(latin)
            .build(&req, &size(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            TagpressError::Encoding(EncodingError::MissingGlyphs { .. })
        ));
    }
}
