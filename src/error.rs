//! # Error Types
//!
//! This module defines error types used throughout the tagpress library.
//!
//! | Variant | Retried by transport | Raised before network I/O |
//! |---------|----------------------|---------------------------|
//! | `Connection` | yes | no |
//! | `Timeout` | yes | no |
//! | `Protocol` | no | no |
//! | `Encoding` | no | yes |
//! | `UnsupportedLabelType` | no | yes |

use thiserror::Error;

/// Errors raised while turning label input into printer bytes.
///
/// These always fail fast: nothing reaches the printer once one of these
/// has been produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Empty or otherwise unusable input (empty text, empty item number)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// EPC configuration does not match the scheme's bit layout
    #[error("invalid EPC config: {0}")]
    InvalidConfig(String),

    /// A value does not fit its field in the EPC bit layout
    #[error("value does not fit EPC layout: {0}")]
    Overflow(String),

    /// Barcode payload cannot be expressed in Code 128
    #[error("cannot encode barcode payload {0:?} as Code 128")]
    UnencodableBarcode(String),

    /// Non-Latin text requested but no typeface was configured
    #[error("no typeface configured to rasterize {0:?}")]
    MissingTypeface(String),

    /// The typeface has no glyph for some characters of the text
    #[error("typeface {typeface} has no glyphs for {missing:?}")]
    MissingGlyphs { typeface: String, missing: String },
}

/// Main error type for tagpress operations
#[derive(Debug, Error)]
pub enum TagpressError {
    /// Printer unreachable, connection refused or dropped
    #[error("Printer unreachable: {0}")]
    Connection(String),

    /// Connect or response read exceeded the configured timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Printer answered with something we cannot parse
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// EPC, barcode or rasterization input rejected
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Label type string not one of the known types
    #[error("Unsupported label type: {0}")]
    UnsupportedLabelType(String),

    /// Caller misuse (empty batch, missing required field)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid printer or label configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TagpressError {
    /// Whether the transport should try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }

    /// Whether this is a "printer offline" condition rather than a bad
    /// request or a confused printer.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Result alias used across the crate
pub type TagpressResult<T> = Result<T, TagpressError>;
