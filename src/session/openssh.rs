//! Transport that drives the system ssh client
// (c) 2024 Ross Younger
//!
//! Every exec channel is a separate `ssh` child process whose stdin and stdout form the duplex stream.
//! `ssh` does its own prompting on the terminal, so the credential prompt is never consulted.

use std::{
    io::{Read, Write},
    process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio},
};

use tracing::{debug, trace, warn};

use super::{CredentialPrompt, ExecChannel, Session, Target, Transport, TransportError};

/// Transport backed by an external `ssh` binary
#[derive(Debug, Clone)]
pub struct OpenSsh {
    program: String,
    options: Vec<String>,
}

impl OpenSsh {
    /// Constructor. `options` are passed to the client before the destination.
    pub fn new<S: Into<String>>(program: S, options: Vec<String>) -> Self {
        Self {
            program: program.into(),
            options,
        }
    }
}

impl Transport for OpenSsh {
    type Session = OpenSshSession;

    fn connect(
        &self,
        target: &Target,
        _prompt: &mut dyn CredentialPrompt,
    ) -> Result<Self::Session, TransportError> {
        debug!("using {} for {target}", self.program);
        Ok(OpenSshSession {
            client: self.clone(),
            target: target.clone(),
        })
    }
}

/// Nothing is held open between channels; this only remembers where to go
#[derive(Debug)]
pub struct OpenSshSession {
    client: OpenSsh,
    target: Target,
}

impl OpenSshSession {
    fn command_for(&self, remote_command: &str) -> Command {
        let mut cmd = Command::new(&self.client.program);
        let _ = cmd.args(&self.client.options);
        if self.target.port != 22 {
            let _ = cmd.args(["-p", &self.target.port.to_string()]);
        }
        let _ = cmd
            .arg(format!("{}@{}", self.target.user, self.target.host))
            .arg(remote_command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }
}

impl Session for OpenSshSession {
    type Channel = OpenSshChannel;

    fn exec(&mut self, command: &str) -> Result<Self::Channel, TransportError> {
        let mut cmd = self.command_for(command);
        trace!("spawning command: {cmd:?}");
        let mut child = cmd.spawn().map_err(|e| TransportError::Connect {
            address: self.target.to_string(),
            source: e,
        })?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TransportError::Stream(std::io::Error::other(
                "could not access ssh process pipes",
            )));
        };
        Ok(OpenSshChannel {
            child,
            stdin: Some(stdin),
            stdout,
        })
    }

    fn disconnect(&mut self) {
        trace!("session for {} finished", self.target);
    }
}

/// One `ssh` child process
#[derive(Debug)]
pub struct OpenSshChannel {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
}

impl Read for OpenSshChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stdout.read(buf)
    }
}

impl Write for OpenSshChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.stdin.as_mut() {
            Some(pipe) => pipe.write(buf),
            None => Err(std::io::ErrorKind::BrokenPipe.into()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.stdin.as_mut() {
            Some(pipe) => pipe.flush(),
            None => Ok(()),
        }
    }
}

impl ExecChannel for OpenSshChannel {
    fn close(&mut self) -> std::io::Result<()> {
        // Dropping our end of stdin is how the remote command sees EOF
        drop(self.stdin.take());
        report_exit(self.child.wait()?);
        Ok(())
    }

    fn disconnect(&mut self) {
        drop(self.stdin.take());
        match self.child.try_wait() {
            Ok(Some(_)) => (),
            Ok(None) => {
                debug!("killing ssh process {}", self.child.id());
                if let Err(e) = self.child.kill() {
                    warn!("could not kill ssh process {}: {e}", self.child.id());
                }
                match self.child.wait() {
                    Ok(status) => trace!("ssh process ended: {status}"),
                    Err(e) => warn!("ssh process {}: {e}", self.child.id()),
                }
            }
            Err(e) => warn!("ssh process: {e}"),
        }
    }
}

/// A failing remote command (or ssh itself) is worth a mention even when the protocol was happy
fn report_exit(status: ExitStatus) {
    if status.success() {
        trace!("ssh exited: {status}");
    } else {
        warn!("ssh exited: {status}");
    }
}
