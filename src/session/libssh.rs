//! In-process SSH transport using libssh2
// (c) 2024 Ross Younger

use std::{
    io::{Read, Write},
    net::{TcpStream, ToSocketAddrs as _},
    path::{Path, PathBuf},
    time::Duration,
};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use ssh2::{CheckResult, HashType, KnownHostFileKind, KnownHostKeyFormat};
use tracing::{debug, trace, warn};

use super::{CredentialPrompt, ExecChannel, Session, Target, Transport, TransportError};

/// Transport backed by the `ssh2` crate
#[derive(Debug, Clone)]
pub struct LibSsh {
    identity: PathBuf,
    known_hosts: PathBuf,
    timeout: Option<Duration>,
}

impl LibSsh {
    /// Constructor.
    /// `identity` is the private key to offer; `known_hosts` is the host key store to check (and add to).
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(identity: P, known_hosts: Q) -> Self {
        Self {
            identity: identity.into(),
            known_hosts: known_hosts.into(),
            timeout: None,
        }
    }

    /// TCP connection timeout. Zero means the OS default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    fn tcp_connect(&self, target: &Target) -> Result<TcpStream, TransportError> {
        let address = format!("{}:{}", target.host, target.port);
        let connect_error = |source: std::io::Error| TransportError::Connect {
            address: address.clone(),
            source,
        };
        let candidates = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(connect_error)?;
        let mut last_error = None;
        for addr in candidates {
            trace!("trying {addr}");
            let attempt = match self.timeout {
                Some(t) => TcpStream::connect_timeout(&addr, t),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }
        Err(connect_error(last_error.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "host has no addresses")
        })))
    }

    /// Checks the server's key against `known_hosts`, asking the user about hosts we haven't seen before
    fn verify_host_key(
        &self,
        session: &ssh2::Session,
        target: &Target,
        prompt: &mut dyn CredentialPrompt,
    ) -> Result<(), TransportError> {
        let host_key_error = |reason: &str| TransportError::HostKey {
            host: target.host.clone(),
            reason: reason.to_owned(),
        };
        let mut known = session
            .known_hosts()
            .map_err(|e| TransportError::backend("reading known hosts", e))?;
        if self.known_hosts.exists() {
            let n = known
                .read_file(&self.known_hosts, KnownHostFileKind::OpenSSH)
                .map_err(|e| {
                    TransportError::backend(format!("reading {}", self.known_hosts.display()), e)
                })?;
            trace!("read {n} known host entries");
        }
        let (key, key_type) = session
            .host_key()
            .ok_or_else(|| host_key_error("server did not present a host key"))?;

        match known.check_port(&target.host, target.port, key) {
            CheckResult::Match => {
                debug!("host key for {} matches known_hosts", target.host);
                Ok(())
            }
            CheckResult::NotFound => {
                let fingerprint = session
                    .host_key_hash(HashType::Sha256)
                    .map(|h| STANDARD_NO_PAD.encode(h))
                    .unwrap_or_default();
                let question = format!(
                    "The authenticity of host '{}' can't be established.\n\
                     {key_type:?} key fingerprint is SHA256:{fingerprint}.\n\
                     Are you sure you want to continue connecting (y/n)?",
                    host_entry(target)
                );
                if !prompt.yes_no(&question).map_err(TransportError::Prompt)? {
                    return Err(host_key_error("rejected by user"));
                }
                let format: KnownHostKeyFormat = key_type.into();
                known
                    .add(&host_entry(target), key, "added by scpush", format)
                    .map_err(|e| TransportError::backend("recording host key", e))?;
                if let Err(e) = known.write_file(&self.known_hosts, KnownHostFileKind::OpenSSH) {
                    warn!(
                        "could not write {}: {e}",
                        self.known_hosts.display()
                    );
                } else {
                    prompt.show_message(&format!(
                        "Permanently added '{}' to the list of known hosts.",
                        host_entry(target)
                    ));
                }
                Ok(())
            }
            CheckResult::Mismatch => Err(host_key_error(
                "REMOTE HOST IDENTIFICATION HAS CHANGED (known_hosts entry does not match)",
            )),
            CheckResult::Failure => Err(host_key_error("known_hosts check failed")),
        }
    }

    fn authenticate(
        &self,
        session: &ssh2::Session,
        target: &Target,
        prompt: &mut dyn CredentialPrompt,
    ) -> Result<(), TransportError> {
        let user = target.user.as_str();
        if self.identity.exists() {
            try_identity(session, user, &self.identity, prompt)?;
            if session.authenticated() {
                return Ok(());
            }
        } else {
            debug!("identity {} not found; skipping", self.identity.display());
        }

        let methods = session
            .auth_methods(user)
            .map_err(|e| TransportError::backend("querying authentication methods", e))?
            .to_owned();
        trace!("server offers: {methods}");

        if offers(&methods, "keyboard-interactive") {
            let mut adaptor = Interactive {
                prompt: &mut *prompt,
                failure: None,
            };
            let result = session.userauth_keyboard_interactive(user, &mut adaptor);
            if let Some(e) = adaptor.failure {
                return Err(TransportError::Prompt(e));
            }
            match result {
                Ok(()) if session.authenticated() => return Ok(()),
                Ok(()) => (),
                Err(e) => debug!("keyboard-interactive authentication failed: {e}"),
            }
        }

        if offers(&methods, "password") {
            let password = prompt
                .password(&format!("{user}@{}'s password", target.host))
                .map_err(TransportError::Prompt)?;
            match session.userauth_password(user, &password) {
                Ok(()) if session.authenticated() => return Ok(()),
                Ok(()) => (),
                Err(e) => debug!("password authentication failed: {e}"),
            }
        }

        Err(TransportError::Authentication {
            user: user.to_owned(),
            host: target.host.clone(),
        })
    }
}

/// Public key authentication, asking for a passphrase if the key doesn't work without one
fn try_identity(
    session: &ssh2::Session,
    user: &str,
    identity: &Path,
    prompt: &mut dyn CredentialPrompt,
) -> Result<(), TransportError> {
    match session.userauth_pubkey_file(user, None, identity, None) {
        Ok(()) => return Ok(()),
        Err(e) if needs_passphrase(&e) => {
            debug!("public key {} could not be loaded: {e}", identity.display());
        }
        Err(e) => {
            // The server turned the key down; a passphrase won't change its mind
            debug!("public key {} rejected: {e}", identity.display());
            return Ok(());
        }
    }
    let passphrase = prompt
        .passphrase(&format!("Enter passphrase for key '{}'", identity.display()))
        .map_err(TransportError::Prompt)?;
    if passphrase.is_empty() {
        return Ok(());
    }
    if let Err(e) = session.userauth_pubkey_file(user, None, identity, Some(&passphrase)) {
        debug!("public key {}: {e}", identity.display());
    }
    Ok(())
}

/// libssh2 reports a private key it can't read or decrypt as `LIBSSH2_ERROR_FILE`
const LIBSSH2_ERROR_FILE: i32 = -16;

/// Is this failure the key file itself (probably encrypted), rather than the server saying no?
fn needs_passphrase(e: &ssh2::Error) -> bool {
    e.code() == ssh2::ErrorCode::Session(LIBSSH2_ERROR_FILE)
}

/// Does a comma-separated method list contain `method`?
fn offers(methods: &str, method: &str) -> bool {
    methods.split(',').any(|m| m.trim() == method)
}

/// The name under which a host is recorded in `known_hosts`
fn host_entry(target: &Target) -> String {
    if target.port == 22 {
        target.host.clone()
    } else {
        format!("[{}]:{}", target.host, target.port)
    }
}

/// Adapts a [`CredentialPrompt`] to libssh2's keyboard-interactive callback
struct Interactive<'a> {
    prompt: &'a mut dyn CredentialPrompt,
    failure: Option<std::io::Error>,
}

impl ssh2::KeyboardInteractivePrompt for Interactive<'_> {
    fn prompt(
        &mut self,
        _username: &str,
        instructions: &str,
        prompts: &[ssh2::Prompt<'_>],
    ) -> Vec<String> {
        if !instructions.is_empty() {
            self.prompt.show_message(instructions);
        }
        let mut answers = Vec::with_capacity(prompts.len());
        for p in prompts {
            if self.failure.is_some() {
                answers.push(String::new());
                continue;
            }
            let text = p.text.trim_end().trim_end_matches(':');
            match self.prompt.password(text) {
                Ok(answer) => answers.push(answer),
                Err(e) => {
                    self.failure = Some(e);
                    answers.push(String::new());
                }
            }
        }
        answers
    }
}

impl Transport for LibSsh {
    type Session = LibSshSession;

    fn connect(
        &self,
        target: &Target,
        prompt: &mut dyn CredentialPrompt,
    ) -> Result<Self::Session, TransportError> {
        debug!("connecting to {target}");
        let tcp = self.tcp_connect(target)?;
        let mut session =
            ssh2::Session::new().map_err(|e| TransportError::backend("creating session", e))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| TransportError::backend("SSH handshake", e))?;
        self.verify_host_key(&session, target, prompt)?;
        self.authenticate(&session, target, prompt)?;
        debug!("authenticated as {}", target.user);
        Ok(LibSshSession {
            session,
            host: target.host.clone(),
        })
    }
}

/// An authenticated libssh2 session
pub struct LibSshSession {
    session: ssh2::Session,
    host: String,
}

impl std::fmt::Debug for LibSshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibSshSession")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl Session for LibSshSession {
    type Channel = LibSshChannel;

    fn exec(&mut self, command: &str) -> Result<Self::Channel, TransportError> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| TransportError::backend("opening channel", e))?;
        trace!("exec {command:?}");
        channel
            .exec(command)
            .map_err(|e| TransportError::backend(format!("running {command:?}"), e))?;
        Ok(LibSshChannel { channel })
    }

    fn disconnect(&mut self) {
        debug!("disconnecting from {}", self.host);
        if let Err(e) = self.session.disconnect(None, "scpush finished", None) {
            warn!("disconnect from {}: {e}", self.host);
        }
    }
}

/// One exec channel on a libssh2 session
pub struct LibSshChannel {
    channel: ssh2::Channel,
}

impl std::fmt::Debug for LibSshChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibSshChannel").finish_non_exhaustive()
    }
}

impl Read for LibSshChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.channel.read(buf)
    }
}

impl Write for LibSshChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.channel.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.channel.flush()
    }
}

impl ExecChannel for LibSshChannel {
    fn close(&mut self) -> std::io::Result<()> {
        self.channel.send_eof()?;
        self.channel.wait_eof()?;
        self.channel.close()?;
        self.channel.wait_close()?;
        Ok(())
    }

    fn disconnect(&mut self) {
        match self.channel.exit_status() {
            Ok(0) => trace!("remote command exited successfully"),
            Ok(status) => warn!("remote command exited with status {status}"),
            Err(e) => trace!("no exit status: {e}"),
        }
        // Closing twice is harmless; this covers the case where close() was never reached
        if !self.channel.eof() {
            if let Err(e) = self.channel.close() {
                debug!("closing channel: {e}");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::borrow::Cow;
    use std::time::Duration;

    use ssh2::KeyboardInteractivePrompt as _;

    use super::{host_entry, needs_passphrase, offers, Interactive, LibSsh};
    use crate::session::{
        mock::NoPrompt, CredentialPrompt, Target, Transport as _, TransportError,
    };

    fn target(port: u16) -> Target {
        Target {
            host: "localhost".into(),
            port,
            user: "nobody".into(),
        }
    }

    #[test]
    fn known_hosts_names() {
        assert_eq!(host_entry(&target(22)), "localhost");
        assert_eq!(host_entry(&target(2222)), "[localhost]:2222");
    }

    #[test]
    fn method_lists() {
        let m = "publickey,password,keyboard-interactive";
        assert!(offers(m, "password"));
        assert!(offers(m, "keyboard-interactive"));
        assert!(!offers(m, "hostbased"));
        assert!(!offers("publickey", "password"));
    }

    #[test]
    fn passphrase_only_for_unreadable_keys() {
        use ssh2::{Error, ErrorCode};
        assert!(needs_passphrase(&Error::new(
            ErrorCode::Session(-16),
            "Unable to extract public key from private key file"
        )));
        // authentication failed; public key unverified
        for code in [-18, -19] {
            assert!(!needs_passphrase(&Error::new(
                ErrorCode::Session(code),
                "rejected"
            )));
        }
        assert!(!needs_passphrase(&Error::new(ErrorCode::SFTP(-16), "odd")));
    }

    #[test]
    fn zero_timeout_means_default() {
        let t = LibSsh::new("/x", "/y").with_timeout(Duration::ZERO);
        assert!(t.timeout.is_none());
        let t = t.with_timeout(Duration::from_secs(5));
        assert_eq!(t.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn connection_refused() {
        // Find a port with nothing listening on it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let mut t = target(port);
        t.host = "127.0.0.1".into();
        let err = LibSsh::new("/nonexistent", "/nonexistent")
            .with_timeout(Duration::from_secs(2))
            .connect(&t, &mut NoPrompt)
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }), "{err:?}");
    }

    #[derive(Default)]
    struct Answers {
        asked: Vec<String>,
        shown: Vec<String>,
        fail: bool,
    }

    impl CredentialPrompt for Answers {
        fn passphrase(&mut self, _: &str) -> std::io::Result<String> {
            unreachable!()
        }
        fn password(&mut self, message: &str) -> std::io::Result<String> {
            if self.fail {
                return Err(std::io::ErrorKind::UnexpectedEof.into());
            }
            self.asked.push(message.to_owned());
            Ok(format!("answer{}", self.asked.len()))
        }
        fn yes_no(&mut self, _: &str) -> std::io::Result<bool> {
            unreachable!()
        }
        fn show_message(&mut self, message: &str) {
            self.shown.push(message.to_owned());
        }
    }

    #[test]
    fn keyboard_interactive_adaptor() {
        let mut answers = Answers::default();
        let prompts = [
            ssh2::Prompt {
                text: Cow::Borrowed("Password: "),
                echo: false,
            },
            ssh2::Prompt {
                text: Cow::Borrowed("Token:"),
                echo: true,
            },
        ];
        let mut uut = Interactive {
            prompt: &mut answers,
            failure: None,
        };
        let result = uut.prompt("nobody", "Two factors please", &prompts);
        assert_eq!(result, vec!["answer1", "answer2"]);
        assert!(uut.failure.is_none());
        assert_eq!(answers.asked, vec!["Password", "Token"]);
        assert_eq!(answers.shown, vec!["Two factors please"]);
    }

    #[test]
    fn keyboard_interactive_failure_is_kept() {
        let mut answers = Answers {
            fail: true,
            ..Answers::default()
        };
        let prompts = [ssh2::Prompt {
            text: Cow::Borrowed("Password: "),
            echo: false,
        }];
        let mut uut = Interactive {
            prompt: &mut answers,
            failure: None,
        };
        let result = uut.prompt("nobody", "", &prompts);
        assert_eq!(result, vec![String::new()]);
        assert!(uut.failure.is_some());
    }
}
