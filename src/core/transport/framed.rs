//! Newline framing shared by the stream transports

use super::{TransportError, TransportStats};
use bytes::{Buf, BytesMut};
use futures::StreamExt;
use std::time::{Duration, Instant};
use std::{cmp, io};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Framed};

/// Longest line accepted from the board before the framer discards it
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// One unit produced by [`BoardLineCodec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, terminator and trailing `\r` removed
    Line(String),
    /// A line longer than the limit, dropped through its terminator
    Overlong,
}

/// Splits board output on `\n`
///
/// Bytes are decoded lossily, so stray non-UTF-8 noise on the wire turns into
/// replacement characters instead of an error. An overlong line is skipped
/// up to the next `\n` and reported once as [`Frame::Overlong`]; the stream
/// stays usable afterwards.
#[derive(Debug, Clone)]
pub struct BoardLineCodec {
    max_length: usize,
    // bytes already scanned for a newline
    next_index: usize,
    discarding: bool,
}

impl BoardLineCodec {
    /// Codec that drops lines longer than `max_length` bytes
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }

    /// Configured limit
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

fn text(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

impl Decoder for BoardLineCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        loop {
            let read_to = cmp::min(self.max_length.saturating_add(1), buf.len());
            let newline = buf[self.next_index..read_to].iter().position(|b| *b == b'\n');

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    buf.advance(self.next_index + offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                    return Ok(Some(Frame::Overlong));
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let line = buf.split_to(end + 1);
                    return Ok(Some(Frame::Line(text(&line[..end]))));
                }
                (false, None) if buf.len() > self.max_length => {
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        self.next_index = 0;
        if self.discarding {
            buf.clear();
            self.discarding = false;
            return Ok(Some(Frame::Overlong));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split();
        Ok(Some(Frame::Line(text(&rest))))
    }
}

/// A byte stream split into `\n`-terminated lines
///
/// Trailing `\r` is stripped. Writes bypass the codec so commands go out
/// exactly as given, with no terminator appended.
pub struct LineStream<S> {
    framed: Framed<S, BoardLineCodec>,
    stats: TransportStats,
    opened_at: Instant,
}

impl<S> LineStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a stream with the default line limit
    pub fn new(stream: S) -> Self {
        Self::with_max_line_length(stream, DEFAULT_MAX_LINE_LENGTH)
    }

    /// Wrap a stream with an explicit line limit
    pub fn with_max_line_length(stream: S, max_line_length: usize) -> Self {
        Self {
            framed: Framed::new(stream, BoardLineCodec::new(max_line_length)),
            stats: TransportStats::default(),
            opened_at: Instant::now(),
        }
    }

    /// Write raw bytes and flush
    pub async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.framed.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;

        self.stats.bytes_sent += data.len() as u64;
        self.stats.commands_sent += 1;
        Ok(())
    }

    /// Read the next line, or `None` once `timeout` elapses
    ///
    /// A line over the limit also reads as `None`, the same as a reply that
    /// never came.
    pub async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        match tokio::time::timeout(timeout, self.framed.next()).await {
            Err(_) => {
                self.stats.read_timeouts += 1;
                Ok(None)
            }
            Ok(None) => Err(TransportError::Disconnected),
            Ok(Some(Ok(Frame::Line(line)))) => {
                self.stats.lines_received += 1;
                Ok(Some(line))
            }
            Ok(Some(Ok(Frame::Overlong))) => {
                self.stats.lines_discarded += 1;
                tracing::warn!(
                    "Discarded a line longer than {} bytes",
                    self.framed.codec().max_length()
                );
                Ok(None)
            }
            Ok(Some(Err(e))) => Err(TransportError::IoError(e)),
        }
    }

    /// Shut down the write half
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.framed.get_mut().shutdown().await?;
        Ok(())
    }

    /// Statistics since the stream was wrapped
    pub fn stats(&self) -> TransportStats {
        let mut stats = self.stats.clone();
        stats.uptime_secs = self.opened_at.elapsed().as_secs();
        stats
    }

    /// Access the wrapped stream
    pub fn get_ref(&self) -> &S {
        self.framed.get_ref()
    }
}
