/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/5/25
******************************************************************************/

/// Module containing the error type used throughout the library.
///
/// This module provides `SubscriptionError`, which separates fatal stream faults
/// from per-frame problems and from normal cancellation.
pub mod error;
mod util;

mod logger;

pub use error::{DecodeError, Result, SubscriptionError};
pub use logger::{setup_logger, setup_logger_with_level};
pub(crate) use util::{clean_line, find_ignore_ascii_case};
pub use util::setup_signal_hook;
