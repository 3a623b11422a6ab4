//! Newline framing over the serial byte stream.
//!
//! The device emits one ASCII record per line. Reads arrive in arbitrary
//! chunks, so a single read may hold part of a line, exactly one line, or
//! several lines. [`LineFramer`] buffers whatever is left after a terminator
//! and hands it out on the next call.
//!
//! Failure policy:
//! - A line longer than the frame limit yields [`StreamError::Framing`]; the
//!   rest of that line is skipped and framing resumes after its terminator.
//! - A failed read yields [`StreamError::Transport`] and discards the partial
//!   frame. The next call starts clean.
//! - A zero-length read yields [`StreamError::TransportClosed`].

use crate::error::{AppResult, StreamError};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Line terminator
pub const FRAME_TERMINATOR: u8 = b'\n';

/// Accumulates transport reads into newline-terminated frames.
pub struct LineFramer<R> {
    reader: R,
    pending: BytesMut,
    chunk: Box<[u8]>,
    max_frame_bytes: usize,
    /// Skipping the tail of an oversized line
    resyncing: bool,
}

impl<R: AsyncRead + Unpin> LineFramer<R> {
    /// Create a framer reading `chunk_bytes` at a time and rejecting frames
    /// longer than `max_frame_bytes` (terminator included).
    pub fn new(reader: R, chunk_bytes: usize, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            pending: BytesMut::with_capacity(max_frame_bytes),
            chunk: vec![0u8; chunk_bytes.max(1)].into_boxed_slice(),
            max_frame_bytes: max_frame_bytes.max(1),
            resyncing: false,
        }
    }

    /// Seed the buffer with bytes already read from the transport, such as
    /// data that trailed the handshake acknowledgement.
    pub fn with_prefix(mut self, prefix: &[u8]) -> Self {
        self.pending.extend_from_slice(prefix);
        self
    }

    /// Read the next frame, terminator included.
    ///
    /// Cancel-safe: bytes already read stay buffered if the future is dropped.
    pub async fn read_frame(&mut self) -> AppResult<Bytes> {
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(frame);
            }

            match self.reader.read(&mut self.chunk).await {
                Ok(0) => {
                    self.reset();
                    return Err(StreamError::TransportClosed);
                }
                Ok(n) => self.pending.extend_from_slice(&self.chunk[..n]),
                Err(e) => {
                    self.reset();
                    return Err(StreamError::Transport(e.to_string()));
                }
            }
        }
    }

    /// Bytes buffered but not yet returned as a frame
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    fn take_frame(&mut self) -> AppResult<Option<Bytes>> {
        loop {
            let terminator = self.pending.iter().position(|b| *b == FRAME_TERMINATOR);

            let Some(pos) = terminator else {
                if self.resyncing {
                    self.pending.clear();
                } else if self.pending.len() >= self.max_frame_bytes {
                    self.pending.clear();
                    self.resyncing = true;
                    return Err(self.overflow());
                }
                return Ok(None);
            };

            let frame = self.pending.split_to(pos + 1).freeze();
            if self.resyncing {
                // Tail of the oversized line, already reported
                self.resyncing = false;
                continue;
            }
            if frame.len() > self.max_frame_bytes {
                return Err(self.overflow());
            }
            return Ok(Some(frame));
        }
    }

    fn overflow(&self) -> StreamError {
        StreamError::Framing {
            limit: self.max_frame_bytes,
        }
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.resyncing = false;
    }
}
