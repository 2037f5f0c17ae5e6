//! # EPC Encoding
//!
//! Derives the 96-bit Electronic Product Code written to each RFID tag.
//!
//! ## Why Sequence Matters
//!
//! Printing five copies of the same item produces five physical tags. If
//! they all carried the same EPC, readers downstream would see one tag.
//! The serial field therefore packs both the copy number and the copy
//! count, so copy 3 of 5 and copy 4 of 5 always differ.
//!
//! ## Bit Layouts
//!
//! ```text
//! SGTIN-96  | header 0x30 (8) | filter (3) | partition (3) | company (M) | item (N) | serial (38) |
//!           |                                              |   M + N = 44           | seq 19 | total 19 |
//!
//! GID-96    | header 0x35 (8) | manager (28) | object class (24) | serial (36)       |
//!                                                               | seq 18 | total 18 |
//! ```
//!
//! The SGTIN partition value follows the GS1 table: the company prefix
//! length (6 to 12 digits) decides how the 44 middle bits are split.
//!
//! ## Example
//!
//! ```
//! use tagpress::epc::{self, EpcConfig};
//!
//! let config = EpcConfig::default();
//! let a = epc::encode("FG-001", 2, 5, &config).unwrap();
//! let b = epc::encode("FG-001", 3, 5, &config).unwrap();
//! assert_eq!(a.len(), 24);
//! assert_ne!(a, b);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EncodingError;

/// Hex characters in a 96-bit EPC
pub const EPC_HEX_LEN: usize = 24;

const SGTIN96_HEADER: u8 = 0x30;
const GID96_HEADER: u8 = 0x35;

/// (company bits, company digits, item bits, item digits) indexed by partition
const SGTIN_PARTITIONS: [(u32, usize, u32, u32); 7] = [
    (40, 12, 4, 1),
    (37, 11, 7, 2),
    (34, 10, 10, 3),
    (30, 9, 14, 4),
    (27, 8, 17, 5),
    (24, 7, 20, 6),
    (20, 6, 24, 7),
];

const GID_MANAGER_BITS: u32 = 28;
const GID_MANAGER_MAX_DIGITS: usize = 8;
const GID_CLASS_BITS: u32 = 24;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Tag encoding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpcScheme {
    #[default]
    Sgtin96,
    Gid96,
}

impl EpcScheme {
    fn header(self) -> u8 {
        match self {
            Self::Sgtin96 => SGTIN96_HEADER,
            Self::Gid96 => GID96_HEADER,
        }
    }

    /// Bits reserved for each of the sequence index and total count.
    fn serial_half_bits(self) -> u32 {
        match self {
            Self::Sgtin96 => 19,
            Self::Gid96 => 18,
        }
    }
}

impl FromStr for EpcScheme {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sgtin96" | "sgtin-96" => Ok(Self::Sgtin96),
            "gid96" | "gid-96" => Ok(Self::Gid96),
            other => Err(EncodingError::InvalidConfig(format!(
                "unknown EPC scheme '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for EpcScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sgtin96 => write!(f, "sgtin96"),
            Self::Gid96 => write!(f, "gid96"),
        }
    }
}

/// How an item number becomes the numeric item reference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemReferenceRule {
    /// FNV-1a hash of the item number, reduced to the field capacity.
    /// Works for any alphanumeric item number.
    #[default]
    Hash,
    /// The decimal digits of the item number, in order ("FG-001" → 1).
    Digits,
}

impl FromStr for ItemReferenceRule {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "digits" => Ok(Self::Digits),
            other => Err(EncodingError::InvalidConfig(format!(
                "unknown item reference rule '{}'",
                other
            ))),
        }
    }
}

/// EPC encoding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpcConfig {
    pub scheme: EpcScheme,
    /// GS1 company prefix (SGTIN) or manager number (GID), decimal digits
    pub company_prefix: String,
    /// SGTIN filter value, 0-7 (1 = point of sale item)
    pub filter: u8,
    pub item_reference: ItemReferenceRule,
}

impl Default for EpcConfig {
    fn default() -> Self {
        Self {
            scheme: EpcScheme::Sgtin96,
            company_prefix: "8850000".to_string(),
            filter: 1,
            item_reference: ItemReferenceRule::Hash,
        }
    }
}

impl EpcConfig {
    /// Check the company prefix and filter against the scheme's layout.
    pub fn validate(&self) -> Result<(), EncodingError> {
        let prefix = &self.company_prefix;
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_digit()) {
            return Err(EncodingError::InvalidConfig(format!(
                "company prefix must be decimal digits, got {:?}",
                prefix
            )));
        }

        match self.scheme {
            EpcScheme::Sgtin96 => {
                sgtin_partition(prefix.len())?;
                if self.filter > 7 {
                    return Err(EncodingError::InvalidConfig(format!(
                        "filter must be 0-7, got {}",
                        self.filter
                    )));
                }
            }
            EpcScheme::Gid96 => {
                if prefix.len() > GID_MANAGER_MAX_DIGITS {
                    return Err(EncodingError::InvalidConfig(format!(
                        "GID-96 manager number must be at most {} digits, got {}",
                        GID_MANAGER_MAX_DIGITS,
                        prefix.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn sgtin_partition(prefix_digits: usize) -> Result<usize, EncodingError> {
    SGTIN_PARTITIONS
        .iter()
        .position(|&(_, digits, _, _)| digits == prefix_digits)
        .ok_or_else(|| {
            EncodingError::InvalidConfig(format!(
                "SGTIN-96 company prefix must be 6-12 digits, got {}",
                prefix_digits
            ))
        })
}

// ============================================================================
// ENCODING
// ============================================================================

/// Encode the EPC for copy `sequence_index` of `total_count` of an item.
///
/// Returns 24 uppercase hex characters, the format `^RFW,H` expects.
/// Deterministic: same inputs, same EPC.
///
/// ## Errors
///
/// - `InvalidInput`: empty item number, zero count, index outside `1..=total`
/// - `InvalidConfig`: company prefix width or filter does not fit the scheme
/// - `Overflow`: item reference or sequence does not fit its bit field
pub fn encode(
    item_number: &str,
    sequence_index: u32,
    total_count: u32,
    config: &EpcConfig,
) -> Result<String, EncodingError> {
    config.validate()?;

    let item_number = item_number.trim();
    if item_number.is_empty() {
        return Err(EncodingError::InvalidInput("item number is empty".into()));
    }
    if total_count == 0 {
        return Err(EncodingError::InvalidInput("total count must be at least 1".into()));
    }
    if sequence_index == 0 || sequence_index > total_count {
        return Err(EncodingError::InvalidInput(format!(
            "sequence index {} outside 1..={}",
            sequence_index, total_count
        )));
    }

    let half = config.scheme.serial_half_bits();
    let limit = 1u64 << half;
    if total_count as u64 >= limit {
        return Err(EncodingError::Overflow(format!(
            "total count {} needs more than {} bits",
            total_count, half
        )));
    }
    let serial = ((sequence_index as u64) << half) | total_count as u64;

    // Validated above: all digits, bounded length
    let prefix_value: u64 = config
        .company_prefix
        .parse()
        .map_err(|_| EncodingError::InvalidConfig("company prefix out of range".into()))?;

    let mut bits = BitWriter::default();
    bits.push(config.scheme.header() as u64, 8);

    match config.scheme {
        EpcScheme::Sgtin96 => {
            let partition = sgtin_partition(config.company_prefix.len())?;
            let (company_bits, _, item_bits, item_digits) = SGTIN_PARTITIONS[partition];
            let item_ref =
                item_reference(item_number, config.item_reference, 10u64.pow(item_digits))?;

            bits.push(config.filter as u64, 3);
            bits.push(partition as u64, 3);
            bits.push(prefix_value, company_bits);
            bits.push(item_ref, item_bits);
            bits.push(serial, half * 2);
        }
        EpcScheme::Gid96 => {
            let item_ref = item_reference(item_number, config.item_reference, 1u64 << GID_CLASS_BITS)?;

            bits.push(prefix_value, GID_MANAGER_BITS);
            bits.push(item_ref, GID_CLASS_BITS);
            bits.push(serial, half * 2);
        }
    }

    debug_assert_eq!(bits.len, 96);
    Ok(bits.to_hex())
}

/// Map an item number onto `0..capacity`.
fn item_reference(
    item_number: &str,
    rule: ItemReferenceRule,
    capacity: u64,
) -> Result<u64, EncodingError> {
    match rule {
        ItemReferenceRule::Hash => Ok(fnv1a_64(item_number.as_bytes()) % capacity),
        ItemReferenceRule::Digits => {
            let digits: String = item_number.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return Err(EncodingError::InvalidInput(format!(
                    "item number {:?} has no digits",
                    item_number
                )));
            }
            let value: u64 = digits.parse().map_err(|_| {
                EncodingError::Overflow(format!("item number {:?} is too large", item_number))
            })?;
            if value >= capacity {
                return Err(EncodingError::Overflow(format!(
                    "item reference {} exceeds capacity {}",
                    value, capacity
                )));
            }
            Ok(value)
        }
    }
}

fn fnv1a_64(data: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    data.iter()
        .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

/// MSB-first accumulator for up to 128 bits.
#[derive(Default)]
struct BitWriter {
    value: u128,
    len: u32,
}

impl BitWriter {
    fn push(&mut self, value: u64, bits: u32) {
        debug_assert!(bits == 64 || value < (1u64 << bits));
        self.value = (self.value << bits) | value as u128;
        self.len += bits;
    }

    fn to_hex(&self) -> String {
        format!("{:0width$X}", self.value, width = (self.len as usize).div_ceil(4))
    }
}

// ============================================================================
// DECODING
// ============================================================================

/// Fields recovered from an EPC, for previews and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedEpc {
    pub hex: String,
    pub scheme: EpcScheme,
    pub filter: Option<u8>,
    pub company_prefix: String,
    pub item_reference: u64,
    pub sequence_index: u32,
    pub total_count: u32,
}

/// Decode a 24-character hex EPC produced by [`encode`].
pub fn decode(hex: &str) -> Result<DecodedEpc, EncodingError> {
    let hex = hex.trim();
    if hex.len() != EPC_HEX_LEN {
        return Err(EncodingError::InvalidInput(format!(
            "EPC must be {} hex characters, got {}",
            EPC_HEX_LEN,
            hex.len()
        )));
    }
    let value = u128::from_str_radix(hex, 16)
        .map_err(|_| EncodingError::InvalidInput(format!("{:?} is not hex", hex)))?;

    let mut reader = BitReader { value, remaining: 96 };
    let header = reader.take(8) as u8;

    let (scheme, filter, company_prefix, item_reference, serial) = match header {
        SGTIN96_HEADER => {
            let filter = reader.take(3) as u8;
            let partition = reader.take(3) as usize;
            let &(company_bits, company_digits, item_bits, _) =
                SGTIN_PARTITIONS.get(partition).ok_or_else(|| {
                    EncodingError::InvalidInput(format!("invalid SGTIN partition {}", partition))
                })?;
            let company = reader.take(company_bits);
            let item = reader.take(item_bits);
            let serial = reader.take(38);
            (
                EpcScheme::Sgtin96,
                Some(filter),
                format!("{:0width$}", company, width = company_digits),
                item,
                serial,
            )
        }
        GID96_HEADER => {
            let manager = reader.take(GID_MANAGER_BITS);
            let class = reader.take(GID_CLASS_BITS);
            let serial = reader.take(36);
            (EpcScheme::Gid96, None, manager.to_string(), class, serial)
        }
        other => {
            return Err(EncodingError::InvalidInput(format!(
                "unsupported EPC header 0x{:02X}",
                other
            )));
        }
    };

    let half = scheme.serial_half_bits();
    Ok(DecodedEpc {
        hex: hex.to_uppercase(),
        scheme,
        filter,
        company_prefix,
        item_reference,
        sequence_index: (serial >> half) as u32,
        total_count: (serial & ((1u64 << half) - 1)) as u32,
    })
}

struct BitReader {
    value: u128,
    remaining: u32,
}

impl BitReader {
    fn take(&mut self, bits: u32) -> u64 {
        self.remaining -= bits;
        ((self.value >> self.remaining) & ((1u128 << bits) - 1)) as u64
    }
}

// ============================================================================
// TESTS
// ============================================================================
