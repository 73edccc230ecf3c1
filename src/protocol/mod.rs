// (c) 2024 Ross Younger

//! Protocol definitions
//!
#![allow(clippy::doc_markdown)]
//! # The SCP sink protocol
//!
//! `scpush` only ever *pushes*. It asks the remote machine to run `scp -t <path>`
//! (`-t` is "to": the remote end becomes the _sink_) and then plays the part of the
//! _source_ over the exec channel's stdin/stdout.
//!
//! The binary does not contain an SSH implementation of its own. Key exchange,
//! authentication, encryption and multiplexing all belong to the [transport](crate::session);
//! everything in this module happens above an already-negotiated duplex byte stream.
//!
//! For each file the exchange looks like this:
//!
//! 1. Source ➡️ Sink: a _timestamp_ control line, `T<mtime> 0 <mtime> 0\n`.
//!    * The modification time is given in whole seconds since the epoch. We do not track
//!      access time separately, so the same value is sent for both fields.
//! 1. Sink ➡️ Source: one status byte.
//! 1. Source ➡️ Sink: a _header_ control line, `C0644 <length> <name> \n`.
//!    * The mode is always `0644`. There is a single space after the name.
//! 1. Sink ➡️ Source: one status byte.
//! 1. Source ➡️ Sink: exactly `<length>` bytes of file content, followed by a single NUL byte.
//! 1. Sink ➡️ Source: one status byte.
//!
//! ## Status bytes
//!
//! | Byte | Meaning |
//! |------|---------|
//! | `0`  | Success |
//! | `1`  | Error; a message follows, terminated by `\n` |
//! | `2`  | Fatal error; a message follows, terminated by `\n` |
//!
//! If the sink closes the stream where a status byte was expected we see end-of-stream.
//! Classic clients treat this as success; see [`channel::EofPolicy`].
//!
//! One file is sent per invocation of the remote command, so every file gets a fresh exec channel.

pub mod channel;
pub mod control;

/// The remote command that turns the peer into an SCP sink for `remote_path`.
///
/// The path is passed through verbatim; it is interpreted by the remote shell.
#[must_use]
pub fn sink_command(remote_path: &str) -> String {
    format!("scp -t {remote_path}")
}

/// A status reply, as read from the sink after each unit we send
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum StatusCode {
    /// `0`
    #[strum(to_string = "success")]
    Success,
    /// `1`: the sink has a complaint, but could carry on
    #[strum(to_string = "error")]
    Error,
    /// `2`: the sink has given up
    #[strum(to_string = "fatal error")]
    FatalError,
    /// The stream ended before a status byte arrived
    #[strum(to_string = "end of stream")]
    UnexpectedEof,
}

impl StatusCode {
    /// Decodes a status byte, or end-of-stream (`None`).
    ///
    /// Unknown byte values are returned as the error.
    pub fn decode(byte: Option<u8>) -> Result<Self, u8> {
        match byte {
            None => Ok(Self::UnexpectedEof),
            Some(0) => Ok(Self::Success),
            Some(1) => Ok(Self::Error),
            Some(2) => Ok(Self::FatalError),
            Some(other) => Err(other),
        }
    }

    /// The wire value of this code. End-of-stream is conventionally reported as -1.
    #[must_use]
    pub fn value(self) -> i8 {
        match self {
            Self::Success => 0,
            Self::Error => 1,
            Self::FatalError => 2,
            Self::UnexpectedEof => -1,
        }
    }

    /// Is a message line expected to follow this status?
    #[must_use]
    pub fn has_message(self) -> bool {
        matches!(self, Self::Error | Self::FatalError)
    }
}

#[cfg(test)]
mod test {
    use super::{sink_command, StatusCode};

    #[test]
    fn decode_known_codes() {
        assert_eq!(StatusCode::decode(Some(0)), Ok(StatusCode::Success));
        assert_eq!(StatusCode::decode(Some(1)), Ok(StatusCode::Error));
        assert_eq!(StatusCode::decode(Some(2)), Ok(StatusCode::FatalError));
        assert_eq!(StatusCode::decode(None), Ok(StatusCode::UnexpectedEof));
    }

    #[test]
    fn decode_unknown_code() {
        assert_eq!(StatusCode::decode(Some(3)), Err(3));
        assert_eq!(StatusCode::decode(Some(b'C')), Err(b'C'));
    }

    #[test]
    fn wire_values() {
        assert_eq!(StatusCode::UnexpectedEof.value(), -1);
        assert_eq!(StatusCode::FatalError.value(), 2);
        assert!(StatusCode::Error.has_message());
        assert!(!StatusCode::Success.has_message());
    }

    #[test]
    fn command_line() {
        assert_eq!(sink_command("/tmp/a.txt"), "scp -t /tmp/a.txt");
    }
}
