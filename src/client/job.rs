//! Transfer requests and the command-line specs they're built from
// (c) 2024 Ross Younger

use std::path::PathBuf;
use std::str::FromStr;

use crate::protocol::channel::EofPolicy;
use crate::session::Target;

/// A file source or destination specified by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSpec {
    /// The remote `[user@]host` for the file. The host may be a hostname or an IP address.
    ///
    /// If not present, this is a local file.
    pub host: Option<String>,
    /// Filename
    ///
    /// If this is a destination, it might be a directory.
    pub filename: String,
}

impl FromStr for FileSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // An optional user@ may precede a bracketed IPv6 address
        let (user, rest) = match s.split_once('@') {
            Some((user, rest)) if rest.starts_with('[') && !user.contains('/') => {
                (Some(user), rest)
            }
            _ => (None, s),
        };
        if rest.starts_with('[') {
            // Assume raw IPv6 address [1:2:3::4]:File
            if let Some((hostish, filename)) = rest.split_once("]:") {
                // lose the brackets so it can be looked up as if a hostname
                let host = &hostish[1..];
                return Ok(Self {
                    host: Some(user.map_or_else(|| host.to_owned(), |u| format!("{u}@{host}"))),
                    filename: filename.into(),
                });
            }
            return Ok(Self {
                host: None,
                filename: s.to_owned(),
            });
        }
        // Host:File or raw IPv4 address 1.2.3.4:File; or just a filename.
        // A colon after a slash is part of a local path.
        match s.split_once(':') {
            Some((host, filename)) if !host.is_empty() && !host.contains('/') => Ok(Self {
                host: Some(host.to_string()),
                filename: filename.to_string(),
            }),
            _ => Ok(Self {
                host: None,
                filename: s.to_owned(),
            }),
        }
    }
}

impl FileSpec {
    /// The user name portion of the host, if one was given
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.host.as_deref()?.split_once('@').map(|(u, _)| u)
    }

    /// The hostname portion, without any user
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        let host = self.host.as_deref()?;
        Some(host.split_once('@').map_or(host, |(_, h)| h))
    }
}

/// One file to send: where it is here, and where it goes there
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    /// Local source file
    pub local: PathBuf,
    /// Remote destination path, as given to `scp -t`
    pub remote: String,
}

/// Everything needed to push a set of files to one remote host.
///
/// Built up with chained calls, then consumed by [`run`](TransferRequest::run):
/// ```no_run
/// # use scpush::client::TransferRequest;
/// # use scpush::session::{libssh::LibSsh, prompt::{ConsolePrompt, TermConsole}};
/// let report = TransferRequest::to("server.example.com")
///     .as_user("deploy")
///     .file("./a.txt", "/tmp/a.txt")
///     .file("./b.txt", "/tmp/")
///     .run(
///         &LibSsh::new("/home/me/.ssh/id_ed25519", "/home/me/.ssh/known_hosts"),
///         &mut ConsolePrompt::new(TermConsole::default()),
///     )?;
/// # Ok::<(), scpush::ScpError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) user: String,
    pub(crate) files: Vec<FilePair>,
    pub(crate) eof_policy: EofPolicy,
}

impl TransferRequest {
    /// Starts a request for the given remote host (port 22, local user name)
    #[must_use]
    pub fn to<S: Into<String>>(host: S) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: String::new(),
            files: Vec::new(),
            eof_policy: EofPolicy::default(),
        }
    }

    /// Sets the remote SSH port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the remote user. An empty string means the local login name.
    #[must_use]
    pub fn as_user<S: Into<String>>(mut self, user: S) -> Self {
        self.user = user.into();
        self
    }

    /// Adds a file. Files are sent in the order they were added.
    #[must_use]
    pub fn file<P: Into<PathBuf>, S: Into<String>>(mut self, local: P, remote: S) -> Self {
        self.files.push(FilePair {
            local: local.into(),
            remote: remote.into(),
        });
        self
    }

    /// Sets whether the remote closing the stream in place of an acknowledgement is a failure
    #[must_use]
    pub fn strict_eof(mut self, strict: bool) -> Self {
        self.eof_policy = strict.into();
        self
    }

    /// The files in this request, in sending order
    #[must_use]
    pub fn files(&self) -> &[FilePair] {
        &self.files
    }

    /// Where we're connecting to.
    /// If no user was set, this is the name of the local user (or "root" if even that can't be determined).
    #[must_use]
    pub fn target(&self) -> Target {
        use crate::os::{AbstractPlatform as _, Platform};
        let user = if self.user.is_empty() {
            Platform::local_user().unwrap_or_else(|| "root".into())
        } else {
            self.user.clone()
        };
        Target {
            host: self.host.clone(),
            port: self.port,
            user,
        }
    }

    /// Builds a request from parsed command-line arguments.
    ///
    /// Every source must be local; the destination must be remote.
    /// A user given in the destination takes precedence over `default_user`.
    pub fn from_specs(
        sources: &[FileSpec],
        destination: &FileSpec,
        default_user: &str,
    ) -> anyhow::Result<Self> {
        let Some(host) = destination.hostname() else {
            anyhow::bail!("destination {} must be remote ([user@]host:path)", destination.filename);
        };
        anyhow::ensure!(!host.is_empty(), "destination host is empty");
        anyhow::ensure!(!sources.is_empty(), "no source files given");
        let user = destination.user().unwrap_or(default_user);
        let remote = if destination.filename.is_empty() {
            // host: alone means the remote home directory
            ".".to_string()
        } else {
            destination.filename.clone()
        };

        let mut request = Self::to(host).as_user(user);
        for src in sources {
            if let Some(h) = &src.host {
                anyhow::bail!("source {h}:{} is remote; only pushing is supported", src.filename);
            }
            request = request.file(&src.filename, remote.clone());
        }
        Ok(request)
    }
}
