//! # ZPL Protocol Implementation
//!
//! This module provides low-level command builders for the Zebra
//! Programming Language spoken by networked label printers.
//!
//! ## Module Structure
//!
//! - [`zpl`]: Label format commands (fields, graphics, barcodes, RFID)
//! - [`control`]: Immediate printer control commands (calibrate, reset, pause)
//! - [`status`]: Parsing of `~HS` host status replies
//!
//! ## Usage Example
//!
//! ```
//! use tagpress::protocol::zpl;
//!
//! let mut label = String::new();
//! label.push_str(zpl::start_format());
//! label.push_str(&zpl::print_width(1181));
//! label.push_str(&zpl::text_field(40, 20, 44, "FG-001"));
//! label.push_str(&zpl::print_quantity(1));
//! label.push_str(zpl::end_format());
//!
//! assert!(label.starts_with("^XA") && label.ends_with("^XZ"));
//! ```

pub mod control;
pub mod status;
pub mod zpl;

pub use control::PrinterCommand;
pub use status::HostStatus;
