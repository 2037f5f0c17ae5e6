//! # Printer Configuration
//!
//! This module defines the physical characteristics of supported label
//! printers, the label stock size, and the runtime settings used to reach
//! a printer over the network.
//!
//! ## Supported Printers
//!
//! | Profile | Resolution | Dots/mm |
//! |---------|------------|---------|
//! | ZT411-300 (and compatible RFID units) | 300 DPI | ~11.8 |
//! | ZT411-203 | 203 DPI | ~8.0 |
//!
//! ## Usage
//!
//! ```
//! use tagpress::printer::{LabelSize, PrinterConfig};
//!
//! let config = PrinterConfig::DPI_300;
//! let size = LabelSize::new(100.0, 30.0).unwrap();
//! assert_eq!(config.mm_to_dots(size.width_mm), 1181);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::epc::{EpcConfig, EpcScheme, ItemReferenceRule};
use crate::error::{TagpressError, TagpressResult};
use crate::transport::TransportConfig;

/// Raw printing port (Zebra/JetDirect convention)
pub const DEFAULT_PORT: u16 = 9100;

/// Prefix for environment variables read by [`PrinterSettings::from_env`]
pub const ENV_PREFIX: &str = "TAGPRESS_";

/// # Printer Configuration
///
/// Defines the resolution of a label printer. Everything else about the
/// label (width, length) comes from the [`LabelSize`] of the stock loaded.
///
/// ## Calculations
///
/// ```text
/// dots_per_mm = dpi / 25.4
///
/// For 300 DPI:
///   dots_per_mm = 300 / 25.4 ≈ 11.8
///   100mm label = 1181 dots
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrinterConfig {
    /// Printer model name
    pub name: &'static str,

    /// Resolution in dots per inch
    pub dpi: u16,
}

impl PrinterConfig {
    /// 300 DPI industrial printer with RFID encoder.
    pub const DPI_300: Self = Self {
        name: "Zebra-compatible 300 DPI",
        dpi: 300,
    };

    /// 203 DPI desktop printer.
    pub const DPI_203: Self = Self {
        name: "Zebra-compatible 203 DPI",
        dpi: 203,
    };

    /// Build a profile for an arbitrary resolution.
    pub fn with_dpi(dpi: u16) -> TagpressResult<Self> {
        match dpi {
            203 => Ok(Self::DPI_203),
            300 => Ok(Self::DPI_300),
            0 => Err(TagpressError::InvalidConfig("DPI must be positive".into())),
            _ => Ok(Self {
                name: "Zebra-compatible",
                dpi,
            }),
        }
    }

    /// Calculate dots per millimeter
    ///
    /// ## Example
    ///
    /// ```
    /// use tagpress::printer::PrinterConfig;
    ///
    /// let config = PrinterConfig::DPI_300;
    /// assert!((config.dots_per_mm() - 11.8).abs() < 0.1);
    /// ```
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Convert millimeters to dots
    #[inline]
    pub fn mm_to_dots(&self, mm: f32) -> u32 {
        (mm * self.dots_per_mm()).round() as u32
    }

    /// Convert dots to millimeters
    #[inline]
    pub fn dots_to_mm(&self, dots: u32) -> f32 {
        dots as f32 / self.dots_per_mm()
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::DPI_300
    }
}

// ============================================================================
// LABEL SIZE
// ============================================================================

/// Physical label dimensions in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelSize {
    #[serde(rename = "width")]
    pub width_mm: f32,
    #[serde(rename = "height")]
    pub height_mm: f32,
}

impl LabelSize {
    /// Validated constructor; both sides must be positive and finite.
    pub fn new(width_mm: f32, height_mm: f32) -> TagpressResult<Self> {
        let size = Self {
            width_mm,
            height_mm,
        };
        size.validate()?;
        Ok(size)
    }

    pub fn validate(&self) -> TagpressResult<()> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if !ok(self.width_mm) || !ok(self.height_mm) {
            return Err(TagpressError::InvalidConfig(format!(
                "label size must be positive, got {}x{} mm",
                self.width_mm, self.height_mm
            )));
        }
        Ok(())
    }

    /// Width and height converted to printer dots.
    pub fn to_dots(&self, printer: &PrinterConfig) -> (u32, u32) {
        (
            printer.mm_to_dots(self.width_mm),
            printer.mm_to_dots(self.height_mm),
        )
    }
}

impl Default for LabelSize {
    fn default() -> Self {
        Self {
            width_mm: 100.0,
            height_mm: 30.0,
        }
    }
}

// ============================================================================
// RUNTIME SETTINGS
// ============================================================================

/// Everything needed to reach a printer and lay out labels for it.
///
/// Loaded from `TAGPRESS_*` environment variables (optionally via `.env`)
/// and overridden by CLI flags or per-request API config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterSettings {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
    /// Total attempts per command, including the first
    pub retries: u32,
    pub retry_backoff_ms: u64,
    /// Quiescent pause between consecutive sends in a batch
    pub batch_delay_ms: u64,
    pub dpi: u16,
    pub label_size: LabelSize,
    pub font_path: Option<String>,
    pub epc: EpcConfig,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            timeout_ms: 5000,
            retries: 3,
            retry_backoff_ms: 500,
            batch_delay_ms: 500,
            dpi: 300,
            label_size: LabelSize::default(),
            font_path: None,
            epc: EpcConfig::default(),
        }
    }
}

impl PrinterSettings {
    /// Load settings from `.env` and the process environment.
    pub fn from_env() -> TagpressResult<Self> {
        // A missing .env file is normal
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> TagpressResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut settings = Self::default();

        if let Some(host) = get("HOST") {
            settings.host = host;
        }
        if let Some(v) = get("PORT") {
            settings.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = get("TIMEOUT_MS") {
            settings.timeout_ms = parse_var("TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("RETRIES") {
            settings.retries = parse_var("RETRIES", &v)?;
        }
        if let Some(v) = get("RETRY_BACKOFF_MS") {
            settings.retry_backoff_ms = parse_var("RETRY_BACKOFF_MS", &v)?;
        }
        if let Some(v) = get("BATCH_DELAY_MS") {
            settings.batch_delay_ms = parse_var("BATCH_DELAY_MS", &v)?;
        }
        if let Some(v) = get("DPI") {
            settings.dpi = parse_var("DPI", &v)?;
        }
        if let Some(v) = get("LABEL_WIDTH_MM") {
            settings.label_size.width_mm = parse_var("LABEL_WIDTH_MM", &v)?;
        }
        if let Some(v) = get("LABEL_HEIGHT_MM") {
            settings.label_size.height_mm = parse_var("LABEL_HEIGHT_MM", &v)?;
        }
        settings.font_path = get("FONT_PATH").filter(|p| !p.trim().is_empty());

        if let Some(v) = get("EPC_SCHEME") {
            settings.epc.scheme = v.parse::<EpcScheme>()?;
        }
        if let Some(v) = get("EPC_COMPANY_PREFIX") {
            settings.epc.company_prefix = v;
        }
        if let Some(v) = get("EPC_FILTER") {
            settings.epc.filter = parse_var("EPC_FILTER", &v)?;
        }
        if let Some(v) = get("EPC_ITEM_REFERENCE") {
            settings.epc.item_reference = v.parse::<ItemReferenceRule>()?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that can never work.
    pub fn validate(&self) -> TagpressResult<()> {
        if self.host.trim().is_empty() {
            return Err(TagpressError::InvalidConfig("printer host is empty".into()));
        }
        if self.port == 0 {
            return Err(TagpressError::InvalidConfig("printer port must be non-zero".into()));
        }
        if self.retries == 0 {
            return Err(TagpressError::InvalidConfig("retries must be at least 1".into()));
        }
        if self.timeout_ms == 0 {
            return Err(TagpressError::InvalidConfig("timeout must be positive".into()));
        }
        PrinterConfig::with_dpi(self.dpi)?;
        self.label_size.validate()
    }

    pub fn printer(&self) -> TagpressResult<PrinterConfig> {
        PrinterConfig::with_dpi(self.dpi)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            host: self.host.clone(),
            port: self.port,
            timeout: Duration::from_millis(self.timeout_ms),
            retries: self.retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> TagpressResult<T> {
    value.trim().parse().map_err(|_| {
        TagpressError::InvalidConfig(format!("{}{}: cannot parse {:?}", ENV_PREFIX, name, value))
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_dots_per_mm() {
        let config = PrinterConfig::DPI_300;
        // 300 DPI ≈ 11.8 dots/mm
        assert!((config.dots_per_mm() - 11.81).abs() < 0.01);
    }

    #[test]
    fn test_mm_to_dots() {
        let config = PrinterConfig::DPI_300;
        assert_eq!(config.mm_to_dots(30.0), 354);
        assert_eq!(PrinterConfig::DPI_203.mm_to_dots(10.0), 80);
    }

    #[test]
    fn test_dots_to_mm() {
        let config = PrinterConfig::DPI_300;
        let mm = config.dots_to_mm(1181);
        assert!((mm - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_zero_dpi_rejected() {
        assert!(PrinterConfig::with_dpi(0).is_err());
        assert_eq!(PrinterConfig::with_dpi(600).unwrap().dpi, 600);
    }

    #[test]
    fn test_label_size_must_be_positive() {
        assert!(LabelSize::new(100.0, 30.0).is_ok());
        assert!(LabelSize::new(0.0, 30.0).is_err());
        assert!(LabelSize::new(100.0, -1.0).is_err());
        assert!(LabelSize::new(f32::NAN, 30.0).is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = PrinterSettings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.port, 9100);
        assert_eq!(settings.retries, 3);
        assert_eq!(settings.label_size, LabelSize::default());
    }

    #[test]
    fn test_settings_from_env_vars() {
        let settings = PrinterSettings::from_lookup(lookup(&[
            ("TAGPRESS_HOST", "10.0.0.50"),
            ("TAGPRESS_PORT", "6101"),
            ("TAGPRESS_RETRIES", "5"),
            ("TAGPRESS_LABEL_WIDTH_MM", "50"),
            ("TAGPRESS_EPC_SCHEME", "gid96"),
        ]))
        .unwrap();

        assert_eq!(settings.host, "10.0.0.50");
        assert_eq!(settings.port, 6101);
        assert_eq!(settings.retries, 5);
        assert_eq!(settings.label_size.width_mm, 50.0);
        assert_eq!(settings.epc.scheme, EpcScheme::Gid96);

        let transport = settings.transport_config();
        assert_eq!(transport.port, 6101);
        assert_eq!(transport.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_settings_reject_bad_values() {
        assert!(PrinterSettings::from_lookup(lookup(&[("TAGPRESS_PORT", "abc")])).is_err());
        assert!(PrinterSettings::from_lookup(lookup(&[("TAGPRESS_RETRIES", "0")])).is_err());
        assert!(PrinterSettings::from_lookup(lookup(&[("TAGPRESS_DPI", "0")])).is_err());
    }
}
