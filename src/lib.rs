//! # Tagpress - ZPL/RFID Label Printing Library
//!
//! Tagpress prints item labels on networked Zebra-compatible printers. It
//! provides:
//!
//! - **Label building**: item number, names, Code 128 barcode and an
//!   optional EPC write, as ZPL
//! - **Text rasterization**: scripts the printer font cannot draw (Thai)
//!   are rendered to `^GFA` graphics
//! - **EPC encoding**: SGTIN-96 and GID-96 with per-copy serials
//! - **Transport**: raw TCP on port 9100 with retries and strict socket
//!   cleanup
//! - **Batch printing**: sequential, paced, with per-item failure isolation
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tagpress::{
//!     batch::{BatchOptions, PrintOrchestrator},
//!     label::{LabelBuilder, LabelRequest, LabelType},
//!     printer::PrinterSettings,
//!     transport::PrinterTransport,
//! };
//!
//! # async fn example() -> tagpress::error::TagpressResult<()> {
//! let settings = PrinterSettings::from_env()?;
//! let builder = Arc::new(LabelBuilder::new(settings.printer()?));
//! let transport = Arc::new(PrinterTransport::new(settings.transport_config()));
//!
//! let orchestrator = PrintOrchestrator::from_settings(&settings, builder, transport);
//! let items = [LabelRequest::new("FG-001", "Office Desk")
//!     .label_type(LabelType::Barcode)
//!     .quantity(2)];
//!
//! let result = orchestrator.print_batch(&items, &BatchOptions::default()).await?;
//! println!("{} of {} printed", result.summary.succeeded, result.summary.total);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`label`] | Label requests, types, layout and the ZPL builder |
//! | [`protocol`] | ZPL and control command builders, host status parsing |
//! | [`render`] | Text to 1-bit bitmap |
//! | [`epc`] | EPC encoding and decoding |
//! | [`transport`] | Printer connections |
//! | [`service`] | Printer control operations |
//! | [`batch`] | Batch printing |
//! | [`server`] | HTTP API |
//! | [`printer`] | Printer resolution, label size, runtime settings |
//! | [`error`] | Error types |

pub mod batch;
pub mod epc;
pub mod error;
pub mod label;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod server;
pub mod service;
pub mod transport;

// Re-exports for convenience
pub use error::{TagpressError, TagpressResult};
pub use label::{LabelBuilder, LabelRequest, LabelType};
pub use printer::{PrinterConfig, PrinterSettings};
pub use transport::PrinterTransport;
