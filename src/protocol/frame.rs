/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::utils::{Result, SubscriptionError, find_ignore_ascii_case};
use std::fmt;
use tracing::debug;

/// Header tag announcing a primary payload frame.
pub const DEFAULT_PRIMARY_TAG: &str = "event: message";
/// Header tag announcing a heartbeat frame.
pub const DEFAULT_HEARTBEAT_TAG: &str = "event: heartbeat";
/// Marker preceding the payload on a data line. Matched ignoring ASCII case.
pub const DEFAULT_DATA_MARKER: &str = "data: ";

/// Kind of frame, as announced by its header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Primary payload the consumer subscribed for.
    Data,
    /// Server liveness frame.
    Heartbeat,
    /// Any other header. Such frames are skipped.
    Unknown,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Data => write!(f, "data"),
            FrameKind::Heartbeat => write!(f, "heartbeat"),
            FrameKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// One header + data unit of the event protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    /// Kind announced by the header line
    pub kind: FrameKind,
    /// Everything following the data marker on the data line
    pub raw_payload: String,
}

/// Groups lines into [`EventFrame`]s.
///
/// Lines are pushed one at a time. The first non-blank line is a header; the
/// next non-blank line is its data line. A frame is emitted only when the
/// header is known and the data line carries the data marker.
#[derive(Debug, Clone)]
pub struct FrameParser {
    primary_tag: String,
    heartbeat_tag: String,
    data_marker: String,
    pending: Option<FrameKind>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Creates a parser for the default `event: message` / `event: heartbeat` tags.
    pub fn new() -> Self {
        Self::with_tags(DEFAULT_PRIMARY_TAG, DEFAULT_HEARTBEAT_TAG, DEFAULT_DATA_MARKER)
    }

    /// Creates a parser with application-defined header tags and data marker.
    pub fn with_tags(
        primary_tag: impl Into<String>,
        heartbeat_tag: impl Into<String>,
        data_marker: impl Into<String>,
    ) -> Self {
        Self {
            primary_tag: primary_tag.into(),
            heartbeat_tag: heartbeat_tag.into(),
            data_marker: data_marker.into(),
            pending: None,
        }
    }

    /// Classifies a header line.
    pub fn classify_header(&self, line: &str) -> FrameKind {
        if line.starts_with(&self.primary_tag) {
            FrameKind::Data
        } else if line.starts_with(&self.heartbeat_tag) {
            FrameKind::Heartbeat
        } else {
            FrameKind::Unknown
        }
    }

    /// Returns the payload following the data marker, if the marker is present.
    pub fn extract_payload<'a>(&self, line: &'a str) -> Option<&'a str> {
        find_ignore_ascii_case(line, &self.data_marker)
            .map(|position| &line[position + self.data_marker.len()..])
    }

    /// Feeds one line into the parser and returns a frame once one is complete.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::MalformedFrame`] when a known header is
    /// followed by a data line without the data marker. The frame is dropped
    /// and the parser is ready for the next header.
    pub fn push_line(&mut self, line: &str) -> Result<Option<EventFrame>> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let Some(kind) = self.pending.take() else {
            let kind = self.classify_header(line);
            if kind == FrameKind::Unknown {
                debug!("Skipping frame with unknown header: {}", line);
            }
            self.pending = Some(kind);
            return Ok(None);
        };

        if kind == FrameKind::Unknown {
            return Ok(None);
        }

        match self.extract_payload(line) {
            Some(payload) => Ok(Some(EventFrame {
                kind,
                raw_payload: payload.to_string(),
            })),
            None => Err(SubscriptionError::MalformedFrame(format!(
                "{} frame without '{}' marker",
                kind,
                self.data_marker.trim_end()
            ))),
        }
    }

    /// Returns `true` when a header has been read but its data line has not.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Forgets a half-read frame.
    pub fn reset(&mut self) {
        self.pending = None;
    }
}
