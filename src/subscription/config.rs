/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::protocol::{DEFAULT_DATA_MARKER, DEFAULT_HEARTBEAT_TAG, DEFAULT_PRIMARY_TAG};
use crate::protocol::{DEFAULT_MAX_LINE_LENGTH, FrameParser};
use crate::utils::{Result, SubscriptionError};
use std::time::Duration;

/// Configuration for a subscription run.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionConfig {
    /// How long `stop()` waits for the background task before closing the stream anyway
    pub stop_timeout: Duration,
    /// Header prefix announcing a primary payload frame
    pub primary_tag: String,
    /// Header prefix announcing a heartbeat frame
    pub heartbeat_tag: String,
    /// Marker preceding the payload on a data line (matched ignoring ASCII case)
    pub data_marker: String,
    /// Longest line accepted, in bytes. Longer lines are truncated
    pub max_line_length: usize,
    /// Multiplier applied to the server's heartbeat timeout before the stream is reported stale
    pub stale_grace: f64,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_millis(250),
            primary_tag: DEFAULT_PRIMARY_TAG.to_string(),
            heartbeat_tag: DEFAULT_HEARTBEAT_TAG.to_string(),
            data_marker: DEFAULT_DATA_MARKER.to_string(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            stale_grace: 2.0,
        }
    }
}

impl SubscriptionConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config with a short stop timeout, for tests
    pub fn fast() -> Self {
        Self {
            stop_timeout: Duration::from_millis(50),
            ..Self::default()
        }
    }

    /// Sets the stop timeout
    #[must_use]
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Sets the header prefix of primary frames
    #[must_use]
    pub fn with_primary_tag(mut self, tag: impl Into<String>) -> Self {
        self.primary_tag = tag.into();
        self
    }

    /// Sets the header prefix of heartbeat frames
    #[must_use]
    pub fn with_heartbeat_tag(mut self, tag: impl Into<String>) -> Self {
        self.heartbeat_tag = tag.into();
        self
    }

    /// Sets the data marker
    #[must_use]
    pub fn with_data_marker(mut self, marker: impl Into<String>) -> Self {
        self.data_marker = marker.into();
        self
    }

    /// Sets the maximum line length
    #[must_use]
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Sets the staleness grace multiplier
    #[must_use]
    pub fn with_stale_grace(mut self, grace: f64) -> Self {
        self.stale_grace = grace;
        self
    }

    /// Builds a frame parser for these tags.
    pub(crate) fn frame_parser(&self) -> FrameParser {
        FrameParser::with_tags(
            self.primary_tag.clone(),
            self.heartbeat_tag.clone(),
            self.data_marker.clone(),
        )
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.stop_timeout.is_zero() {
            return Err(invalid("stop_timeout must be greater than 0"));
        }

        if self.primary_tag.is_empty() || self.heartbeat_tag.is_empty() {
            return Err(invalid("header tags must not be empty"));
        }

        if self.primary_tag.starts_with(&self.heartbeat_tag)
            || self.heartbeat_tag.starts_with(&self.primary_tag)
        {
            return Err(invalid(
                "primary and heartbeat tags must not be prefixes of each other",
            ));
        }

        if self.data_marker.is_empty() {
            return Err(invalid("data_marker must not be empty"));
        }

        if self.max_line_length == 0 {
            return Err(invalid("max_line_length must be greater than 0"));
        }

        if !self.stale_grace.is_finite() || self.stale_grace < 1.0 {
            return Err(invalid("stale_grace must be a finite value >= 1.0"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> SubscriptionError {
    SubscriptionError::InvalidConfig(message.to_string())
}
