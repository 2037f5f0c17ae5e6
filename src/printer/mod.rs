//! # Printer Module
//!
//! This module provides printer-specific configurations and utilities.
//!
//! ## Modules
//!
//! - [`config`]: Printer resolution, label stock size, runtime settings

pub mod config;

pub use config::{DEFAULT_PORT, LabelSize, PrinterConfig, PrinterSettings};
