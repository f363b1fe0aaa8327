/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::utils::{SubscriptionError, clean_line};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader, ReadBuf};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Default upper bound for a single line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

type BoxedStream = Box<dyn AsyncRead + Send + Unpin + 'static>;
type StreamSlot = Arc<Mutex<Option<BoxedStream>>>;

fn lock_stream(slot: &StreamSlot) -> MutexGuard<'_, Option<BoxedStream>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read side of a stream that a [`StreamCloser`] may close at any time.
/// Once closed it reads as end-of-stream.
struct SharedStream(StreamSlot);

impl AsyncRead for SharedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match lock_stream(&self.0).as_mut() {
            Some(stream) => Pin::new(stream).poll_read(cx, buf),
            None => Poll::Ready(Ok(())),
        }
    }
}

/// Closes the stream behind a [`LineReader`], wherever that reader currently is.
#[derive(Clone)]
pub(crate) struct StreamCloser(StreamSlot);

impl StreamCloser {
    /// Drops the underlying stream. Returns `false` if it was already closed.
    pub(crate) fn close(&self) -> bool {
        lock_stream(&self.0).take().is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        lock_stream(&self.0).is_none()
    }
}

/// Outcome of a single [`LineReader::next_line`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// A complete line, without its line terminator.
    Line(String),
    /// The stream reached its end.
    EndOfStream,
    /// Cancellation was requested before or during the read.
    Cancelled,
}

/// Reads `\n` separated lines (tolerating `\r\n`) from an owned byte stream.
///
/// Every read races the cancellation token passed to it, so a read that is
/// waiting for data returns [`LineRead::Cancelled`] as soon as the token fires.
pub struct LineReader {
    inner: BufReader<SharedStream>,
    buffer: Vec<u8>,
    max_line_length: usize,
    discarding: bool,
}

impl LineReader {
    /// Wraps an open byte stream. The reader takes ownership of it; dropping
    /// the reader closes the stream unless a [`StreamCloser`] still holds it.
    pub fn new<R>(stream: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let stream: BoxedStream = Box::new(stream);
        Self {
            inner: BufReader::new(SharedStream(Arc::new(Mutex::new(Some(stream))))),
            buffer: Vec::new(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            discarding: false,
        }
    }

    /// Sets the maximum line length. Longer lines are truncated and the
    /// remainder of the line is skipped.
    #[must_use]
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.set_max_line_length(max_line_length);
        self
    }

    pub(crate) fn set_max_line_length(&mut self, max_line_length: usize) {
        self.max_line_length = max_line_length.max(1);
    }

    /// Handle that closes this reader's stream, even while the reader is
    /// owned by another task.
    pub(crate) fn closer(&self) -> StreamCloser {
        StreamCloser(Arc::clone(&self.inner.get_ref().0))
    }

    /// Reads the next line.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::StreamIo`] when the underlying stream fails
    /// while no cancellation is pending. A failure observed after the token
    /// fired is reported as [`LineRead::Cancelled`] instead.
    pub async fn next_line(
        &mut self,
        token: &CancellationToken,
    ) -> Result<LineRead, SubscriptionError> {
        loop {
            if token.is_cancelled() {
                return Ok(LineRead::Cancelled);
            }

            self.buffer.clear();
            // One extra byte leaves room for the terminating newline.
            let limit = self.max_line_length as u64 + 1;
            let mut limited = (&mut self.inner).take(limit);

            let read = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(LineRead::Cancelled),
                read = limited.read_until(b'\n', &mut self.buffer) => read,
            };

            let read = match read {
                Ok(read) => read,
                Err(_) if token.is_cancelled() => return Ok(LineRead::Cancelled),
                Err(err) => return Err(SubscriptionError::StreamIo(err)),
            };

            if read == 0 {
                return Ok(LineRead::EndOfStream);
            }

            let complete = self.buffer.ends_with(b"\n");
            if self.discarding {
                if complete {
                    self.discarding = false;
                }
                continue;
            }

            if !complete && read as u64 == limit {
                warn!(
                    "Line exceeds {} bytes, truncating and skipping the remainder",
                    self.max_line_length
                );
                self.buffer.truncate(self.max_line_length);
                self.discarding = true;
            }

            let line = clean_line(&self.buffer);
            trace!("Line: {}", line);
            return Ok(LineRead::Line(line));
        }
    }
}

impl std::fmt::Debug for LineReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineReader")
            .field("max_line_length", &self.max_line_length)
            .field("discarding", &self.discarding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    struct FailingStream;

    impl AsyncRead for FailingStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    async fn collect_lines(reader: &mut LineReader) -> Vec<String> {
        let token = CancellationToken::new();
        let mut lines = Vec::new();
        while let Ok(LineRead::Line(line)) = reader.next_line(&token).await {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_reads_lf_and_crlf_lines() {
        let mut reader = LineReader::new(&b"event: message\r\ndata: {}\nlast"[..]);
        let lines = collect_lines(&mut reader).await;
        assert_eq!(lines, vec!["event: message", "data: {}", "last"]);
    }

    #[tokio::test]
    async fn test_end_of_stream() {
        let token = CancellationToken::new();
        let mut reader = LineReader::new(&b""[..]);
        assert_eq!(
            reader.next_line(&token).await.unwrap(),
            LineRead::EndOfStream
        );
    }

    #[tokio::test]
    async fn test_blank_lines_are_returned_as_empty() {
        let mut reader = LineReader::new(&b"\n\r\nx\n"[..]);
        let lines = collect_lines(&mut reader).await;
        assert_eq!(lines, vec!["", "", "x"]);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let mut reader = LineReader::new(&b"data: {}\n"[..]);
        assert_eq!(reader.next_line(&token).await.unwrap(), LineRead::Cancelled);
        // Nothing was consumed, so the line is still there after cancellation
        let fresh = CancellationToken::new();
        assert_eq!(
            reader.next_line(&fresh).await.unwrap(),
            LineRead::Line("data: {}".to_string())
        );
    }

    #[tokio::test]
    async fn test_pending_read_unblocks_on_cancel() {
        // The writer half stays open, so the read would wait forever.
        let (_writer, stream) = tokio::io::duplex(64);
        let mut reader = LineReader::new(stream);
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let read = tokio::time::timeout(Duration::from_secs(1), reader.next_line(&token))
            .await
            .expect("read did not unblock");
        assert_eq!(read.unwrap(), LineRead::Cancelled);
    }

    #[tokio::test]
    async fn test_partial_line_is_completed_across_writes() {
        let (mut writer, stream) = tokio::io::duplex(64);
        let mut reader = LineReader::new(stream);
        let token = CancellationToken::new();

        writer.write_all(b"event: mes").await.unwrap();
        let pending = tokio::spawn(async move {
            let line = reader.next_line(&token).await.unwrap();
            (line, reader)
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        writer.write_all(b"sage\n").await.unwrap();

        let (line, _reader) = pending.await.unwrap();
        assert_eq!(line, LineRead::Line("event: message".to_string()));
    }

    #[tokio::test]
    async fn test_io_error_is_fatal() {
        let token = CancellationToken::new();
        let mut reader = LineReader::new(FailingStream);
        let err = reader.next_line(&token).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_long_line_is_truncated_and_remainder_skipped() {
        let mut reader = LineReader::new(&b"0123456789\nok\n"[..]).with_max_line_length(4);
        let lines = collect_lines(&mut reader).await;
        assert_eq!(lines, vec!["0123", "ok"]);
    }

    #[tokio::test]
    async fn test_line_of_exact_max_length_is_kept() {
        let mut reader = LineReader::new(&b"abcd\nef\n"[..]).with_max_line_length(4);
        let lines = collect_lines(&mut reader).await;
        assert_eq!(lines, vec!["abcd", "ef"]);
    }

    #[tokio::test]
    async fn test_closer_closes_stream_held_elsewhere() {
        let (mut writer, stream) = tokio::io::duplex(64);
        let mut reader = LineReader::new(stream);
        let closer = reader.closer();
        writer.write_all(b"data: 1\n").await.unwrap();

        // The reader lives in another task while the stream is closed
        let pending = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let token = CancellationToken::new();
            let first = reader.next_line(&token).await.unwrap();
            let second = reader.next_line(&token).await.unwrap();
            (first, second)
        });

        assert!(!closer.is_closed());
        assert!(closer.close());
        assert!(closer.is_closed());
        assert!(!closer.close());
        let err = writer.write_all(b"data: 2\n").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let (first, second) = pending.await.unwrap();
        assert_eq!(first, LineRead::EndOfStream);
        assert_eq!(second, LineRead::EndOfStream);
    }
}
