//! The transport seam: sessions and exec channels
// (c) 2024 Ross Younger
//!
//! `scpush` does not speak SSH itself. A [`Transport`] knows how to reach a remote machine and
//! authenticate, yielding a [`Session`]; a session runs remote commands, each on its own
//! [`ExecChannel`], which is nothing more than a duplex byte stream that can be closed.
//!
//! Two transports are provided:
//! * [`libssh::LibSsh`] (default) uses libssh2 in-process.
//! * [`openssh::OpenSsh`] spawns the system `ssh` client for every exec channel.

use std::io::{Read, Write};

pub mod libssh;
pub mod openssh;
pub mod prompt;

#[cfg(test)]
pub(crate) mod mock;

pub use prompt::CredentialPrompt;

/// Who and where we are connecting to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Hostname or IP address
    pub host: String,
    /// SSH port
    pub port: u16,
    /// Remote user name
    pub user: String,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Something that can establish an authenticated session with a remote host
pub trait Transport {
    /// The session type produced
    type Session: Session;

    /// Connects and authenticates. The prompt is consulted for anything the user has to answer.
    fn connect(
        &self,
        target: &Target,
        prompt: &mut dyn CredentialPrompt,
    ) -> Result<Self::Session, TransportError>;
}

/// An established, authenticated session
pub trait Session {
    /// The exec channel type produced
    type Channel: ExecChannel;

    /// Starts a remote command on a fresh channel.
    /// On success the command is running and its stdin/stdout are available as the channel's stream.
    fn exec(&mut self, command: &str) -> Result<Self::Channel, TransportError>;

    /// Tears down the session. Failures are logged, not reported.
    fn disconnect(&mut self);
}

/// The duplex stream of one remote command
pub trait ExecChannel: Read + Write {
    /// Closes both directions of the stream
    fn close(&mut self) -> std::io::Result<()>;

    /// Releases the channel. Failures are logged, not reported.
    fn disconnect(&mut self);
}

/// Failure to establish or use a session
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network connection failed
    #[error("could not connect to {address}: {source}")]
    Connect {
        /// What we were trying to reach
        address: String,
        /// Underlying cause
        source: std::io::Error,
    },
    /// The remote host key could not be verified
    #[error("host key verification failed for {host}: {reason}")]
    HostKey {
        /// Remote host
        host: String,
        /// Explanation
        reason: String,
    },
    /// No authentication method succeeded
    #[error("authentication failed for {user}@{host}")]
    Authentication {
        /// Remote user
        user: String,
        /// Remote host
        host: String,
    },
    /// The SSH implementation reported a problem
    #[error("{context}: {source}")]
    Backend {
        /// What we were doing
        context: String,
        /// Underlying cause
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The credential prompt failed (e.g. no terminal)
    #[error("could not prompt for credentials: {0}")]
    Prompt(#[source] std::io::Error),
    /// The stream failed
    #[error(transparent)]
    Stream(#[from] std::io::Error),
}

impl TransportError {
    /// Wraps a backend error with some context
    pub fn backend<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
