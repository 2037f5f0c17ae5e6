//! # ZPL Format Commands
//!
//! This module implements the subset of Zebra Programming Language used to
//! describe a label. Every function returns the command text; callers
//! concatenate them into a format that starts with `^XA` and ends with `^XZ`.
//!
//! ## Command Structure
//!
//! ```text
//! ^XA                      start format
//! ^CI28                    field data is UTF-8
//! ^PW1181                  print width (dots)
//! ^LL354                   label length (dots)
//! ^FO40,23^A0N,44,44^FDFG-001^FS    text field
//! ^FO40,80^GFA,...^FS      graphic field (rasterized text)
//! ^BY2,3,88^FO40,200^BCN,88,Y,N,N,A^FDFG-001^FS    Code 128
//! ^RS8^RFW,H^FD3034...^FS  RFID write
//! ^PQ1                     quantity
//! ^XZ                      end format
//! ```
//!
//! ## Field Data Escaping
//!
//! `^` and `~` start commands anywhere in the stream, so item data that
//! contains them would be executed. Such payloads are emitted with `^FH`
//! and `_XX` hex escapes.

use std::fmt::Write;

/// Separator emitted after each command line of a format
pub const LINE_END: &str = "\n";

/// Hex escape indicator used with `^FH`
const HEX_INDICATOR: char = '_';

// ============================================================================
// FORMAT FRAMING
// ============================================================================

/// # Start Format (^XA)
#[inline]
pub fn start_format() -> &'static str {
    "^XA"
}

/// # End Format (^XZ)
///
/// Closes the label; the printer starts printing when it sees this.
#[inline]
pub fn end_format() -> &'static str {
    "^XZ"
}

/// # Change International Font/Encoding (^CI28)
///
/// Selects UTF-8 for subsequent field data.
#[inline]
pub fn utf8_encoding() -> &'static str {
    "^CI28"
}

/// # Label Home (^LH)
#[inline]
pub fn label_home(x: u32, y: u32) -> String {
    format!("^LH{},{}", x, y)
}

/// # Print Width (^PWa)
///
/// ## Parameters
///
/// - `dots`: label width in dots (minimum 2)
#[inline]
pub fn print_width(dots: u32) -> String {
    format!("^PW{}", dots.max(2))
}

/// # Label Length (^LLy)
#[inline]
pub fn label_length(dots: u32) -> String {
    format!("^LL{}", dots.max(1))
}

/// # Print Quantity (^PQq)
///
/// The printer repeats the format `q` times. Identical copies only: any
/// RFID write inside the format is repeated with the same EPC.
#[inline]
pub fn print_quantity(copies: u32) -> String {
    format!("^PQ{}", copies.max(1))
}

// ============================================================================
// FIELDS
// ============================================================================

/// # Field Origin (^FOx,y)
#[inline]
pub fn field_origin(x: u32, y: u32) -> String {
    format!("^FO{},{}", x, y)
}

/// # Field Data (^FD...^FS)
///
/// Escapes `^`, `~` and `_` through `^FH` when present.
///
/// ## Example
///
/// ```
/// use tagpress::protocol::zpl;
///
/// assert_eq!(zpl::field_data("FG-001"), "^FDFG-001^FS");
/// assert_eq!(zpl::field_data("A^B"), "^FH_^FDA_5EB^FS");
/// ```
pub fn field_data(data: &str) -> String {
    if !needs_escape(data) {
        return format!("^FD{}^FS", data);
    }

    let mut escaped = String::with_capacity(data.len() + 8);
    for ch in data.chars() {
        if is_reserved(ch) {
            // Reserved characters are ASCII, one byte each
            let _ = write!(escaped, "{}{:02X}", HEX_INDICATOR, ch as u32);
        } else {
            escaped.push(ch);
        }
    }
    format!("^FH{}^FD{}^FS", HEX_INDICATOR, escaped)
}

fn is_reserved(ch: char) -> bool {
    matches!(ch, '^' | '~' | HEX_INDICATOR)
}

fn needs_escape(data: &str) -> bool {
    data.chars().any(is_reserved)
}

/// # Scalable Font Text Field (^A0N,h,w)
///
/// Positions and prints `text` in the printer's built-in scalable font
/// (font 0, normal orientation). Only reliable for Latin text.
pub fn text_field(x: u32, y: u32, height: u32, text: &str) -> String {
    format!(
        "{}^A0N,{},{}{}",
        field_origin(x, y),
        height,
        height,
        field_data(text)
    )
}

/// # Graphic Field, ASCII Hex (^GFA,b,c,d,data)
///
/// ## Parameters
///
/// - `bytes_per_row`: row stride of the packed bitmap
/// - `data`: 1 bit per dot, MSB = leftmost, rows top to bottom
///
/// Both byte counts (`b` and `c`) equal `data.len()` since the data is
/// not compressed.
pub fn graphic_field(x: u32, y: u32, bytes_per_row: usize, data: &[u8]) -> String {
    let mut hex = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(hex, "{:02X}", byte);
    }
    format!(
        "{}^GFA,{},{},{},{}^FS",
        field_origin(x, y),
        data.len(),
        data.len(),
        bytes_per_row,
        hex
    )
}

// ============================================================================
// BARCODES
// ============================================================================

/// # Bar Code Field Defaults (^BYw,r,h)
///
/// - `module_width`: narrow bar width in dots (1-10)
/// - `ratio`: wide to narrow ratio (ignored by Code 128, kept at 3.0)
/// - `height`: bar height in dots
#[inline]
pub fn barcode_defaults(module_width: u32, height: u32) -> String {
    format!("^BY{},3,{}", module_width.clamp(1, 10), height)
}

/// # Code 128 (^BCN,h,f,g,e,m)
///
/// Normal orientation, human readable line below the bars when
/// `interpretation_line` is set, automatic subset selection (mode `A`).
pub fn code128(x: u32, y: u32, height: u32, data: &str, interpretation_line: bool) -> String {
    format!(
        "{}^BCN,{},{},N,N,A{}",
        field_origin(x, y),
        height,
        if interpretation_line { "Y" } else { "N" },
        field_data(data)
    )
}

// ============================================================================
// RFID
// ============================================================================

/// # Set Up RFID Parameters (^RS8)
///
/// Tag type 8 = EPC Class 1 Gen 2.
#[inline]
pub fn rfid_setup() -> &'static str {
    "^RS8"
}

/// # Write EPC (^RFW,H)
///
/// Writes `epc_hex` to the EPC memory bank of the tag in the encoder.
#[inline]
pub fn rfid_write_epc(epc_hex: &str) -> String {
    format!("^RFW,H^FD{}^FS", epc_hex)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing() {
        assert_eq!(start_format(), "^XA");
        assert_eq!(end_format(), "^XZ");
        assert_eq!(utf8_encoding(), "^CI28");
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(print_width(1181), "^PW1181");
        assert_eq!(label_length(354), "^LL354");
        assert_eq!(label_home(0, 0), "^LH0,0");
    }

    #[test]
    fn test_print_quantity_minimum_one() {
        assert_eq!(print_quantity(5), "^PQ5");
        assert_eq!(print_quantity(0), "^PQ1");
    }

    #[test]
    fn test_field_data_escaping() {
        assert_eq!(field_data("plain text"), "^FDplain text^FS");
        assert_eq!(field_data("~JR"), "^FH_^FD_7EJR^FS");
        assert_eq!(field_data("a_b"), "^FH_^FDa_5Fb^FS");
        // Non-ASCII passes through untouched
        assert_eq!(field_data("โต๊ะ"), "^FDโต๊ะ^FS");
    }

    #[test]
    fn test_text_field() {
        assert_eq!(
            text_field(40, 23, 44, "FG-001"),
            "^FO40,23^A0N,44,44^FDFG-001^FS"
        );
    }

    #[test]
    fn test_graphic_field() {
        let cmd = graphic_field(10, 20, 2, &[0xFF, 0x00, 0x0A, 0x80]);
        assert_eq!(cmd, "^FO10,20^GFA,4,4,2,FF000A80^FS");
    }

    #[test]
    fn test_code128() {
        assert_eq!(barcode_defaults(2, 88), "^BY2,3,88");
        assert_eq!(barcode_defaults(0, 50), "^BY1,3,50");
        assert_eq!(
            code128(40, 200, 88, "FG-001", true),
            "^FO40,200^BCN,88,Y,N,N,A^FDFG-001^FS"
        );
    }

    #[test]
    fn test_rfid_write() {
        assert_eq!(rfid_setup(), "^RS8");
        assert_eq!(
            rfid_write_epc("303ACB9000000400000C0005"),
            "^RFW,H^FD303ACB9000000400000C0005^FS"
        );
    }
}
