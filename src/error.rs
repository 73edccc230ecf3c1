//! The error type reported by a transfer
// (c) 2024 Ross Younger

use std::path::PathBuf;

use crate::{
    protocol::{channel::ChannelError, control::UnitError},
    session::TransportError,
};

/// Everything that can go wrong with a transfer, in one of three kinds
#[derive(Debug, thiserror::Error)]
pub enum ScpError {
    /// Connecting, authenticating, or the byte stream itself failed
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The remote sink refused something, or said something we don't understand
    #[error("{}: {source}", .file.display())]
    Protocol {
        /// The local file being sent
        file: PathBuf,
        /// What happened
        source: ChannelError,
    },
    /// A local source file could not be read
    #[error("{}: {source}", .path.display())]
    LocalIo {
        /// The local file
        path: PathBuf,
        /// What happened
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ScpError {
    /// Classifies a failure of the sink exchange for `file`
    #[must_use]
    pub fn from_channel(file: PathBuf, error: ChannelError) -> Self {
        match error {
            ChannelError::Io(e) => Self::Transport(TransportError::Stream(e)),
            ChannelError::Source(e) => Self::LocalIo {
                path: file,
                source: Box::new(e),
            },
            // The file shrank after its header went out
            short @ ChannelError::SizeMismatch { .. } => Self::LocalIo {
                path: file,
                source: Box::new(short),
            },
            other => Self::Protocol {
                file,
                source: other,
            },
        }
    }

    /// A local file couldn't be opened or described
    pub fn local<E>(path: PathBuf, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::LocalIo {
            path,
            source: Box::new(error),
        }
    }

    /// The text sent by the remote sink along with an error status, if there was one
    #[must_use]
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Protocol { source, .. } => source.remote_message(),
            _ => None,
        }
    }
}

impl From<(PathBuf, UnitError)> for ScpError {
    fn from((path, error): (PathBuf, UnitError)) -> Self {
        Self::local(path, error)
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::ScpError;
    use crate::{
        protocol::{channel::ChannelError, control::UnitError, StatusCode},
        session::TransportError,
    };

    #[test]
    fn classification() {
        let f = PathBuf::from("a.txt");
        let e = ScpError::from_channel(
            f.clone(),
            ChannelError::Io(std::io::ErrorKind::BrokenPipe.into()),
        );
        assert!(matches!(e, ScpError::Transport(TransportError::Stream(_))));

        let e = ScpError::from_channel(
            f.clone(),
            ChannelError::Source(std::io::ErrorKind::Other.into()),
        );
        assert!(matches!(e, ScpError::LocalIo { .. }));

        let e = ScpError::from_channel(
            f.clone(),
            ChannelError::SizeMismatch {
                expected: 10,
                sent: 5,
            },
        );
        assert!(matches!(e, ScpError::LocalIo { .. }), "{e:?}");
        assert_eq!(
            e.to_string(),
            "a.txt: source file supplied 5 bytes but the header announced 10"
        );

        let e = ScpError::from_channel(f.clone(), ChannelError::UnknownStatus(9));
        assert!(matches!(e, ScpError::Protocol { .. }));
        assert_eq!(e.to_string(), "a.txt: unknown status code 9");
        assert!(e.remote_message().is_none());

        let e = ScpError::from((f, UnitError::Directory));
        assert_eq!(e.to_string(), "a.txt: is a directory");
    }

    #[test]
    fn remote_text_is_exposed() {
        let e = ScpError::from_channel(
            "x".into(),
            ChannelError::Rejected {
                status: StatusCode::Error,
                message: "disk full".into(),
            },
        );
        assert_eq!(e.remote_message(), Some("disk full"));
        assert_eq!(e.to_string(), "x: remote error: disk full");
    }
}
