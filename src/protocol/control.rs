//! # Printer Control Commands
//!
//! Tilde (`~`) commands act immediately, even while a format is printing.
//! Caret commands that change configuration are wrapped in their own
//! `^XA...^XZ` format.
//!
//! | Command | Wire | Reply |
//! |---------|------|-------|
//! | Host status | `~HS` | 3 STX/ETX frames |
//! | Calibrate media | `~JC` | none |
//! | Soft reset | `~JR` | none |
//! | Factory defaults + reset | `^XA^JUF^XZ` `~JR` | none |
//! | Cancel all formats | `~JA` | none |
//! | Feed one label | `^XA^PH^XZ` | none |
//! | Pause | `~PP` | none |
//! | Resume | `~PS` | none |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TagpressError;

/// Terminator appended to control commands
pub const CRLF: &str = "\r\n";

/// Number of STX/ETX frames in a `~HS` reply
pub const HOST_STATUS_FRAMES: usize = 3;

/// A named printer control operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrinterCommand {
    /// Reachability probe; answered with host status
    TestConnection,
    Status,
    Calibrate,
    Reset,
    FullReset,
    CancelAll,
    Feed,
    Pause,
    Resume,
}

impl PrinterCommand {
    /// All commands, in menu order.
    pub const ALL: [PrinterCommand; 9] = [
        Self::TestConnection,
        Self::Status,
        Self::Calibrate,
        Self::Reset,
        Self::FullReset,
        Self::CancelAll,
        Self::Feed,
        Self::Pause,
        Self::Resume,
    ];

    /// The exact bytes sent to the printer, terminated with CRLF.
    pub fn wire(self) -> String {
        let body = match self {
            Self::TestConnection | Self::Status => "~HS",
            Self::Calibrate => "~JC",
            Self::Reset => "~JR",
            Self::FullReset => "^XA^JUF^XZ\r\n~JR",
            Self::CancelAll => "~JA",
            Self::Feed => "^XA^PH^XZ",
            Self::Pause => "~PP",
            Self::Resume => "~PS",
        };
        format!("{}{}", body, CRLF)
    }

    /// STX/ETX frames the printer answers with (0 = fire and forget).
    pub fn reply_frames(self) -> usize {
        match self {
            Self::TestConnection | Self::Status => HOST_STATUS_FRAMES,
            _ => 0,
        }
    }

    /// Name used by the HTTP API.
    pub fn action_name(self) -> &'static str {
        match self {
            Self::TestConnection => "test",
            Self::Status => "status",
            Self::Calibrate => "calibrate",
            Self::Reset => "reset",
            Self::FullReset => "fullReset",
            Self::CancelAll => "cancel",
            Self::Feed => "feed",
            Self::Pause => "pause",
            Self::Resume => "resume",
        }
    }
}

impl FromStr for PrinterCommand {
    type Err = TagpressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.action_name().eq_ignore_ascii_case(s.trim()))
            .or(match s.trim() {
                "cancelAll" => Some(Self::CancelAll),
                "testConnection" => Some(Self::TestConnection),
                _ => None,
            })
            .ok_or_else(|| TagpressError::InvalidRequest(format!("unknown printer action '{}'", s)))
    }
}

impl fmt::Display for PrinterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action_name())
    }
}
