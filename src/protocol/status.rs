//! # Host Status Replies
//!
//! Printers answer `~HS` with three frames, each wrapped in STX (0x02) and
//! ETX (0x03) and followed by CR LF:
//!
//! ```text
//! <STX>030,0,0,1245,000,0,0,0,000,0,0,0<ETX>\r\n
//! <STX>001,0,0,0,1,2,6,0,00000000,1,000<ETX>\r\n
//! <STX>1234,0<ETX>\r\n
//! ```
//!
//! | Frame | Field | Meaning |
//! |-------|-------|---------|
//! | 1 | 2 | paper out |
//! | 1 | 3 | paused |
//! | 1 | 4 | label length (dots) |
//! | 1 | 5 | formats in receive buffer |
//! | 1 | 6 | receive buffer full |
//! | 1 | 11 | under temperature |
//! | 1 | 12 | over temperature |
//! | 2 | 3 | head open |
//! | 2 | 4 | ribbon out |
//! | 2 | 9 | labels remaining in batch |
//!
//! Frames may arrive split across TCP segments, so [`FrameParser`] is fed
//! byte chunks as they are read.

use serde::Serialize;

use crate::error::{TagpressError, TagpressResult};

const STX: u8 = 0x02;
const ETX: u8 = 0x03;

/// Guard against a misbehaving printer streaming without ETX.
pub const MAX_FRAME_SIZE: usize = 1024;

enum FrameState {
    /// Skipping CR/LF and noise between frames
    WaitingForStx,
    ReadingFrame,
}

/// Incremental STX/ETX frame collector.
pub struct FrameParser {
    expected: usize,
    frames: Vec<Vec<u8>>,
    current: Vec<u8>,
    state: FrameState,
}

impl FrameParser {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            frames: Vec::with_capacity(expected),
            current: Vec::new(),
            state: FrameState::WaitingForStx,
        }
    }

    /// Consume a chunk. Returns `true` once all expected frames are in.
    pub fn feed(&mut self, chunk: &[u8]) -> TagpressResult<bool> {
        for &byte in chunk {
            if self.is_complete() {
                break;
            }
            match (&self.state, byte) {
                (FrameState::WaitingForStx, STX) => {
                    self.current.clear();
                    self.state = FrameState::ReadingFrame;
                }
                (FrameState::WaitingForStx, _) => {}
                (FrameState::ReadingFrame, ETX) => {
                    self.frames.push(std::mem::take(&mut self.current));
                    self.state = FrameState::WaitingForStx;
                }
                (FrameState::ReadingFrame, _) => {
                    if self.current.len() >= MAX_FRAME_SIZE {
                        return Err(TagpressError::Protocol(format!(
                            "status frame exceeds {} bytes",
                            MAX_FRAME_SIZE
                        )));
                    }
                    self.current.push(byte);
                }
            }
        }
        Ok(self.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        self.frames.len() >= self.expected
    }

    pub fn into_frames(self) -> Vec<Vec<u8>> {
        self.frames
    }
}

/// Decoded `~HS` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStatus {
    pub paper_out: bool,
    pub paused: bool,
    pub label_length_dots: u32,
    pub formats_in_buffer: u32,
    pub buffer_full: bool,
    pub under_temperature: bool,
    pub over_temperature: bool,
    pub head_open: bool,
    pub ribbon_out: bool,
    pub labels_remaining: u32,
}

impl HostStatus {
    /// Parse the raw reply (all three frames, with framing bytes).
    pub fn parse(raw: &[u8]) -> TagpressResult<Self> {
        let mut parser = FrameParser::new(2);
        if !parser.feed(raw)? {
            return Err(TagpressError::Protocol(
                "host status reply has fewer than 2 frames".into(),
            ));
        }
        let frames = parser.into_frames();
        let first = split_fields(&frames[0], 12, 1)?;
        let second = split_fields(&frames[1], 11, 2)?;

        Ok(Self {
            paper_out: flag(&first, 1, 1)?,
            paused: flag(&first, 2, 1)?,
            label_length_dots: number(&first, 3, 1)?,
            formats_in_buffer: number(&first, 4, 1)?,
            buffer_full: flag(&first, 5, 1)?,
            under_temperature: flag(&first, 10, 1)?,
            over_temperature: flag(&first, 11, 1)?,
            head_open: flag(&second, 2, 2)?,
            ribbon_out: flag(&second, 3, 2)?,
            labels_remaining: number(&second, 8, 2)?,
        })
    }

    /// Ready to accept a print job.
    pub fn is_ready(&self) -> bool {
        !(self.paper_out
            || self.paused
            || self.head_open
            || self.ribbon_out
            || self.buffer_full
            || self.over_temperature)
    }

    /// Human readable list of blocking conditions.
    pub fn problems(&self) -> Vec<&'static str> {
        [
            (self.paper_out, "paper out"),
            (self.paused, "paused"),
            (self.head_open, "head open"),
            (self.ribbon_out, "ribbon out"),
            (self.buffer_full, "receive buffer full"),
            (self.over_temperature, "head over temperature"),
            (self.under_temperature, "head under temperature"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }
}

fn split_fields(frame: &[u8], min_fields: usize, index: usize) -> TagpressResult<Vec<String>> {
    let text = std::str::from_utf8(frame).map_err(|_| {
        TagpressError::Protocol(format!("status frame {} is not ASCII", index))
    })?;
    let fields: Vec<String> = text.split(',').map(|f| f.trim().to_string()).collect();
    if fields.len() < min_fields {
        return Err(TagpressError::Protocol(format!(
            "status frame {} has {} fields, expected {}",
            index,
            fields.len(),
            min_fields
        )));
    }
    Ok(fields)
}

fn number(fields: &[String], pos: usize, frame: usize) -> TagpressResult<u32> {
    fields[pos].parse().map_err(|_| {
        TagpressError::Protocol(format!(
            "status frame {} field {} is not numeric: {:?}",
            frame,
            pos + 1,
            fields[pos]
        ))
    })
}

fn flag(fields: &[String], pos: usize, frame: usize) -> TagpressResult<bool> {
    match fields[pos].as_str() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(TagpressError::Protocol(format!(
            "status frame {} field {} is not a flag: {:?}",
            frame,
            pos + 1,
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const READY: &[u8] = b"\x02030,0,0,1245,000,0,0,0,000,0,0,0\x03\r\n\
\x02001,0,0,0,1,2,6,0,00000000,1,000\x03\r\n\
\x021234,0\x03\r\n";

    #[test]
    fn test_parse_ready_printer() {
        let status = HostStatus::parse(READY).unwrap();
        assert!(status.is_ready());
        assert_eq!(status.label_length_dots, 1245);
        assert_eq!(status.labels_remaining, 0);
        assert!(status.problems().is_empty());
    }

    #[test]
    fn test_parse_paper_out_and_paused() {
        let raw = b"\x02030,1,1,1245,002,0,0,0,000,0,0,0\x03\r\n\x02001,0,1,0,1,2,6,0,00000007,1,000\x03\r\n";
        let status = HostStatus::parse(raw).unwrap();
        assert!(status.paper_out);
        assert!(status.paused);
        assert!(status.head_open);
        assert_eq!(status.formats_in_buffer, 2);
        assert_eq!(status.labels_remaining, 7);
        assert!(!status.is_ready());
        assert_eq!(status.problems(), vec!["paper out", "paused", "head open"]);
    }

    #[test]
    fn test_frames_split_across_chunks() {
        let mut parser = FrameParser::new(3);
        let (a, b) = READY.split_at(17);
        assert!(!parser.feed(a).unwrap());
        assert!(parser.feed(b).unwrap());
        let frames = parser.into_frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], b"1234,0");
    }

    #[test]
    fn test_malformed_reply_is_protocol_error() {
        let err = HostStatus::parse(b"\x02garbage\x03\x02more\x03").unwrap_err();
        assert!(matches!(err, TagpressError::Protocol(_)));

        let err = HostStatus::parse(b"no frames here").unwrap_err();
        assert!(matches!(err, TagpressError::Protocol(_)));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut parser = FrameParser::new(1);
        let mut data = vec![STX];
        data.extend(std::iter::repeat(b'9').take(MAX_FRAME_SIZE + 1));
        assert!(matches!(parser.feed(&data), Err(TagpressError::Protocol(_))));
    }
}
