//! # Labels
//!
//! What to print: the per-item request, the closed set of label kinds, and
//! the builder that turns both into ZPL.
//!
//! ## Label Types
//!
//! | Type | Name rendering | RFID |
//! |------|----------------|------|
//! | `barcode` | native font, raster for non-Latin | optional |
//! | `thai` | raster for non-Latin | optional |
//! | `thai-rfid` | raster for non-Latin | always |
//! | `packing-slip` | raster for non-Latin, adds `QTY:` line | never |

pub mod builder;
pub mod layout;

pub use builder::{LabelBuilder, LabelJob, ZplDocument};
pub use layout::LabelLayout;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{TagpressError, TagpressResult};

/// Kind of label to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LabelType {
    #[default]
    Barcode,
    Thai,
    ThaiRfid,
    PackingSlip,
}

impl LabelType {
    pub const ALL: [LabelType; 4] = [Self::Barcode, Self::Thai, Self::ThaiRfid, Self::PackingSlip];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Barcode => "barcode",
            Self::Thai => "thai",
            Self::ThaiRfid => "thai-rfid",
            Self::PackingSlip => "packing-slip",
        }
    }

    /// RFID is part of this label regardless of the request flag.
    pub fn requires_rfid(self) -> bool {
        matches!(self, Self::ThaiRfid)
    }

    /// RFID may be turned on by the request flag.
    pub fn allows_rfid(self) -> bool {
        !matches!(self, Self::PackingSlip)
    }
}

impl FromStr for LabelType {
    type Err = TagpressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| TagpressError::UnsupportedLabelType(s.to_string()))
    }
}

impl TryFrom<String> for LabelType {
    type Error = TagpressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LabelType> for String {
    fn from(value: LabelType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LabelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Most labels one request may ask for
pub const MAX_QUANTITY: u32 = 1000;

fn default_quantity() -> u32 {
    1
}

/// One item to be printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRequest {
    /// Item number, e.g. "FG-001"
    pub number: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, alias = "secondaryDisplayName")]
    pub secondary_name: Option<String>,
    #[serde(default, rename = "type", alias = "labelType")]
    pub label_type: LabelType,
    /// Barcode payload; the item number when absent
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, rename = "enableRFID", alias = "enableRfid")]
    pub enable_rfid: bool,
}

impl LabelRequest {
    pub fn new(number: &str, display_name: &str) -> Self {
        Self {
            number: number.to_string(),
            display_name: display_name.to_string(),
            secondary_name: None,
            label_type: LabelType::default(),
            barcode: None,
            quantity: 1,
            enable_rfid: false,
        }
    }

    pub fn label_type(mut self, label_type: LabelType) -> Self {
        self.label_type = label_type;
        self
    }

    pub fn secondary_name(mut self, name: &str) -> Self {
        self.secondary_name = Some(name.to_string());
        self
    }

    pub fn barcode(mut self, payload: &str) -> Self {
        self.barcode = Some(payload.to_string());
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn rfid(mut self, enabled: bool) -> Self {
        self.enable_rfid = enabled;
        self
    }

    /// Barcode payload after defaulting to the item number.
    pub fn barcode_payload(&self) -> &str {
        match self.barcode.as_deref() {
            Some(b) if !b.trim().is_empty() => b.trim(),
            _ => self.number.trim(),
        }
    }

    /// Whether labels for this request carry an EPC write.
    pub fn rfid_enabled(&self) -> bool {
        self.label_type.requires_rfid() || (self.enable_rfid && self.label_type.allows_rfid())
    }

    pub fn validate(&self) -> TagpressResult<()> {
        if self.number.trim().is_empty() {
            return Err(TagpressError::InvalidRequest("item number is required".into()));
        }
        if self.quantity == 0 {
            return Err(TagpressError::InvalidRequest(format!(
                "quantity for {} must be at least 1",
                self.number
            )));
        }
        if self.quantity > MAX_QUANTITY {
            return Err(TagpressError::InvalidRequest(format!(
                "quantity for {} exceeds {} labels per request",
                self.number, MAX_QUANTITY
            )));
        }
        Ok(())
    }
}
