//! Line framing over a byte stream
//!
//! Converts a continuous stream of bytes into complete protocol lines,
//! buffering across partial reads. A terminator split across two reads
//! is reassembled; the terminator itself is stripped before the line is
//! handed to the codec.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

use super::TransportError;

const TERMINATOR: &[u8] = b"\r\n";
const READ_CHUNK: usize = 1024;

/// Lazy line reader over any async byte source.
///
/// One reader exists per connection; its buffer state does not survive
/// the stream it wraps.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    // Terminator scan resumes here instead of rescanning the buffer.
    scanned: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a byte source.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
            scanned: 0,
        }
    }

    /// Wait for the next complete line, terminator stripped.
    ///
    /// Returns `Ok(None)` once the stream closes cleanly. Bytes buffered
    /// without a final terminator at close are reported as a warning and
    /// discarded; they never reach the codec.
    ///
    /// # Errors
    ///
    /// Propagates stream failures as [`TransportError::Read`].
    pub async fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            if let Some(pos) = self.find_terminator() {
                let line = self.buf.split_to(pos);
                self.buf.advance(TERMINATOR.len());
                self.scanned = 0;
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            let read = self
                .inner
                .read_buf(&mut self.buf)
                .await
                .map_err(TransportError::Read)?;

            if read == 0 {
                if !self.buf.is_empty() {
                    warn!(
                        pending = self.buf.len(),
                        "stream closed mid-line, discarding unterminated bytes"
                    );
                    self.buf.clear();
                    self.scanned = 0;
                }
                return Ok(None);
            }
        }
    }

    fn find_terminator(&mut self) -> Option<usize> {
        // Step back one byte in case a CR was the last byte scanned.
        let start = self.scanned.saturating_sub(1);
        let found = self.buf[start..]
            .windows(TERMINATOR.len())
            .position(|window| window == TERMINATOR)
            .map(|pos| start + pos);

        if found.is_none() {
            self.scanned = self.buf.len();
        }
        found
    }
}
