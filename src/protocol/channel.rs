//! The sink protocol state machine
// (c) 2024 Ross Younger
//!
//! A [`ProtocolChannel`] drives the exchange for exactly one file over exactly one exec channel.
//! Every step returns a [`StepResult`]; the caller matches on it rather than unwinding.

use std::io::{ErrorKind, Read};

use indicatif::ProgressBar;
use tracing::{debug, trace, warn};

use super::{control::FileUnit, StatusCode};
use crate::session::ExecChannel;

/// File content is written in chunks of this size (the final chunk is whatever remains)
pub const CHUNK_SIZE: usize = 1024;

/// What to do when the stream ends where a status byte was expected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EofPolicy {
    /// Treat it as success. This is what classic SCP clients do.
    #[default]
    Lenient,
    /// Fail with [`ChannelError::PrematureEof`]
    Strict,
}

impl From<bool> for EofPolicy {
    /// `true` means strict
    fn from(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// Progress through the per-file exchange. Transitions are strictly linear,
/// except that any failure goes straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SinkState {
    /// Remote command is running; nothing sent yet
    Connected,
    /// Timestamp line sent and acknowledged
    TimestampSent,
    /// Header line sent and acknowledged
    HeaderSent,
    /// Content and trailing NUL sent and acknowledged
    ContentSent,
    /// Stream closed (terminal)
    Closed,
}

/// Why a step of the exchange failed
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The sink replied `1` or `2`
    #[error("remote {status}: {message}")]
    Rejected {
        /// Which of the two it was
        status: StatusCode,
        /// Message text sent by the sink, without its newline
        message: String,
    },
    /// The sink replied with something that isn't a status byte
    #[error("unknown status code {0}")]
    UnknownStatus(u8),
    /// The stream ended where a status byte was expected (strict mode only)
    #[error("remote closed the stream before acknowledging")]
    PrematureEof,
    /// Reading from or writing to the exec channel failed
    #[error("channel I/O failed: {0}")]
    Io(#[source] std::io::Error),
    /// Reading the local file failed part-way
    #[error("reading source file failed: {0}")]
    Source(#[source] std::io::Error),
    /// The local file supplied fewer bytes than its header announced
    #[error("source file supplied {sent} bytes but the header announced {expected}")]
    SizeMismatch {
        /// Length sent in the header
        expected: u64,
        /// Bytes actually streamed
        sent: u64,
    },
}

impl ChannelError {
    /// Message text from the sink, if it sent one
    #[must_use]
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Result of one protocol step
pub type StepResult = Result<(), ChannelError>;

/// Sink protocol engine for one file over one exec channel
pub struct ProtocolChannel<'a, C: ExecChannel + ?Sized> {
    stream: &'a mut C,
    state: SinkState,
    eof_policy: EofPolicy,
}

impl<C: ExecChannel + ?Sized> std::fmt::Debug for ProtocolChannel<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolChannel")
            .field("state", &self.state)
            .field("eof_policy", &self.eof_policy)
            .finish_non_exhaustive()
    }
}

impl<'a, C: ExecChannel + ?Sized> ProtocolChannel<'a, C> {
    /// Wraps the streams of an exec channel whose remote command is already running
    pub fn new(stream: &'a mut C, eof_policy: EofPolicy) -> Self {
        Self {
            stream,
            state: SinkState::Connected,
            eof_policy,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SinkState {
        self.state
    }

    /// Runs the whole exchange for one file, then closes the stream.
    ///
    /// `content` must be positioned at the start of the file described by `unit`.
    /// Exactly `unit.length` bytes are read from it.
    pub fn send_file<R: Read>(
        &mut self,
        unit: &FileUnit,
        content: R,
        progress: &ProgressBar,
    ) -> StepResult {
        let result = self.exchange(unit, content, progress);
        if let Err(e) = &result {
            debug!("aborting after {}: {e}", self.state);
        }
        let closed = self.close();
        // An exchange failure is more interesting than whatever close() said about it
        match (result, closed) {
            (Err(e), Err(close_err)) => {
                warn!("failed to close channel: {close_err}");
                Err(e)
            }
            (result, closed) => result.and(closed),
        }
    }

    fn exchange<R: Read>(&mut self, unit: &FileUnit, content: R, progress: &ProgressBar) -> StepResult {
        self.send_control(&unit.timestamp_line(), SinkState::TimestampSent)?;
        self.send_control(&unit.header_line(), SinkState::HeaderSent)?;
        self.send_content(unit.length, content, progress)
    }

    /// Sends a control line and consumes its acknowledgement
    fn send_control(&mut self, line: &str, next: SinkState) -> StepResult {
        trace!("send {:?}", line.trim_end());
        self.stream
            .write_all(line.as_bytes())
            .map_err(ChannelError::Io)?;
        self.acknowledge()?;
        self.state = next;
        Ok(())
    }

    fn send_content<R: Read>(&mut self, length: u64, content: R, progress: &ProgressBar) -> StepResult {
        trace!("send {length} bytes of content");
        let mut source = content.take(length);
        let mut buf = [0u8; CHUNK_SIZE];
        let mut sent = 0u64;
        loop {
            let n = fill_chunk(&mut source, &mut buf).map_err(ChannelError::Source)?;
            if n == 0 {
                break;
            }
            self.stream
                .write_all(&buf[..n])
                .map_err(ChannelError::Io)?;
            sent += n as u64;
            progress.inc(n as u64);
        }
        if sent != length {
            return Err(ChannelError::SizeMismatch {
                expected: length,
                sent,
            });
        }
        self.stream.write_all(&[0]).map_err(ChannelError::Io)?;
        self.acknowledge()?;
        self.state = SinkState::ContentSent;
        Ok(())
    }

    /// Flushes what we've written, then reads and interprets one status reply
    fn acknowledge(&mut self) -> StepResult {
        self.stream.flush().map_err(ChannelError::Io)?;
        let byte = self.read_byte()?;
        match StatusCode::decode(byte) {
            Ok(StatusCode::Success) => Ok(()),
            Ok(StatusCode::UnexpectedEof) => match self.eof_policy {
                EofPolicy::Lenient => {
                    debug!("stream ended where a status byte was expected; continuing");
                    Ok(())
                }
                EofPolicy::Strict => Err(ChannelError::PrematureEof),
            },
            Ok(status) => {
                let message = self.read_message()?;
                Err(ChannelError::Rejected { status, message })
            }
            Err(code) => Err(ChannelError::UnknownStatus(code)),
        }
    }

    /// One byte, or None at end of stream
    fn read_byte(&mut self) -> Result<Option<u8>, ChannelError> {
        let mut byte = [0u8; 1];
        loop {
            match self.stream.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => (),
                Err(e) => return Err(ChannelError::Io(e)),
            }
        }
    }

    /// Reads the text following an error status, one byte at a time, up to a newline or end of stream
    fn read_message(&mut self) -> Result<String, ChannelError> {
        let mut text = Vec::new();
        while let Some(b) = self.read_byte()? {
            if b == b'\n' {
                break;
            }
            text.push(b);
        }
        Ok(String::from_utf8_lossy(&text).into_owned())
    }

    /// Closes both directions of the stream. Only the first call has any effect.
    pub fn close(&mut self) -> StepResult {
        if self.state == SinkState::Closed {
            return Ok(());
        }
        self.state = SinkState::Closed;
        trace!("closing stream");
        self.stream.close().map_err(ChannelError::Io)
    }
}

impl<C: ExecChannel + ?Sized> Drop for ProtocolChannel<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close channel: {e}");
        }
    }
}

/// Reads until `buf` is full or the source is exhausted
fn fill_chunk<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => (),
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
