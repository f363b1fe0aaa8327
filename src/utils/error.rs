/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Error types for subscription runs.
//!
//! Errors fall into two groups: those that end a run (`StreamIo`) and those
//! reported to the consumer while the run keeps going (`PayloadDecode`).
//! `Cancelled` is a normal termination cause and is never reported as a failure.

use crate::protocol::FrameKind;

/// Boxed error returned by payload decoders.
pub type DecodeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while running or controlling a subscription.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// The underlying stream failed. Terminates the current run.
    #[error("Stream I/O error: {0}")]
    StreamIo(#[from] std::io::Error),

    /// A frame could not be interpreted and was dropped.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A frame payload could not be deserialized into its target type.
    #[error("Failed to decode {kind} payload: {source}")]
    PayloadDecode {
        /// Kind of the frame carrying the payload
        kind: FrameKind,
        /// Error reported by the decoder
        #[source]
        source: DecodeError,
    },

    /// The run was cancelled through `stop()`.
    #[error("Subscription cancelled")]
    Cancelled,

    /// `start()` was called while a run is still active.
    #[error("Subscription is already running")]
    AlreadyRunning,

    /// `start()` was called outside of a tokio runtime.
    #[error("No tokio runtime available to spawn the subscription task")]
    NoRuntime,

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SubscriptionError {
    /// Returns `true` if this error ends the run it occurred in.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SubscriptionError::StreamIo(_))
    }

    /// Returns `true` if this error is the normal result of a `stop()` request.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SubscriptionError::Cancelled)
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, SubscriptionError>;
