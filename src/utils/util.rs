use signal_hook::low_level::signal_name;
use signal_hook::{consts::SIGINT, consts::SIGTERM, iterator::Signals};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Turns one raw line, as read up to and including its `\n`, into text.
///
/// The trailing `\n` and an optional `\r` before it are removed. Invalid UTF-8
/// sequences are replaced rather than rejected so a single corrupted byte does
/// not end the subscription.
pub(crate) fn clean_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Case-insensitive search for an ASCII `needle` in `haystack`.
///
/// Returns the byte offset of the first match. Offsets are always on a char
/// boundary because the needle starts with an ASCII byte.
pub(crate) fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - pat.len()).find(|&start| hay[start..start + pat.len()].eq_ignore_ascii_case(pat))
}

/// Sets up a signal hook for SIGINT and SIGTERM.
///
/// Spawns a task that waits for the first of those signals, logs its name and
/// notifies `shutdown_signal`, so the caller can stop its subscriptions in an
/// orderly way.
///
/// # Errors
///
/// Returns the I/O error raised when the signal iterator cannot be registered.
pub async fn setup_signal_hook(shutdown_signal: Arc<Notify>) -> std::io::Result<()> {
    let signals = &[SIGINT, SIGTERM];
    let mut signals_iterator = Signals::new(signals)?;

    tokio::task::spawn_blocking(move || {
        if let Some(signal) = signals_iterator.forever().next() {
            info!(
                "Received signal: {}",
                signal_name(signal).unwrap_or("unknown")
            );
            shutdown_signal.notify_one();
        }
    });
    Ok(())
}
