/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Wire protocol handling for event streams.
//!
//! The server sends two-line frames over a long-lived text stream:
//!
//! ```text
//! event: message
//! data: {"action":"added","deviceInfo":{...}}
//! event: heartbeat
//! data: {"heartbeatTimeout":20000}
//! ```
//!
//! [`LineReader`] splits the byte stream into lines, [`FrameParser`] pairs
//! header and data lines into [`EventFrame`]s and a [`PayloadDecoder`] turns
//! the raw payload into a typed value.

mod decoder;
mod frame;
mod reader;

pub use decoder::{JsonDecoder, PayloadDecoder};
pub use frame::{
    DEFAULT_DATA_MARKER, DEFAULT_HEARTBEAT_TAG, DEFAULT_PRIMARY_TAG, EventFrame, FrameKind,
    FrameParser,
};
pub use reader::{DEFAULT_MAX_LINE_LENGTH, LineRead, LineReader};
pub(crate) use reader::StreamCloser;
