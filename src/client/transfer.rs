//! Running a transfer request
// (c) 2024 Ross Younger

use std::{
    fs::File,
    io::BufReader,
    ops::{Deref, DerefMut},
    path::PathBuf,
    time::{Duration, Instant},
};

use indicatif::{MultiProgress, ProgressBar, ProgressFinish, ProgressStyle};
use tracing::{debug, trace, trace_span};

use super::{
    job::{FilePair, TransferRequest},
    progress::progress_style_for,
};
use crate::{
    error::ScpError,
    protocol::{
        channel::{EofPolicy, ProtocolChannel},
        control::FileUnit,
        sink_command,
    },
    session::{CredentialPrompt, ExecChannel, Session, Transport},
};

/// What was sent for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Local source
    pub local: PathBuf,
    /// Remote destination
    pub remote: String,
    /// Content bytes sent
    pub bytes: u64,
}

/// The outcome of a successful [`TransferRequest::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// One entry per file, in sending order
    pub files: Vec<FileReport>,
    /// Wall time from connecting to disconnecting
    pub elapsed: Duration,
}

impl TransferReport {
    /// Total content bytes sent
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }
}

/// Disconnects the session when dropped
struct SessionGuard<S: Session>(S);

impl<S: Session> Deref for SessionGuard<S> {
    type Target = S;
    fn deref(&self) -> &S {
        &self.0
    }
}

impl<S: Session> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.0
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.0.disconnect();
    }
}

/// Disconnects the exec channel when dropped
struct ChannelGuard<C: ExecChannel>(C);

impl<C: ExecChannel> Deref for ChannelGuard<C> {
    type Target = C;
    fn deref(&self) -> &C {
        &self.0
    }
}

impl<C: ExecChannel> DerefMut for ChannelGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.0
    }
}

impl<C: ExecChannel> Drop for ChannelGuard<C> {
    fn drop(&mut self) {
        self.0.disconnect();
    }
}

impl TransferRequest {
    /// Connects, sends every file in order, and disconnects.
    ///
    /// One session is used for the whole request, with a fresh exec channel per file.
    /// The first failure abandons the remaining files.
    /// Whatever happens, the channel (if any) and then the session (if any) are disconnected before this returns.
    ///
    /// An empty request still connects and disconnects.
    pub fn run<T: Transport>(
        self,
        transport: &T,
        prompt: &mut dyn CredentialPrompt,
    ) -> Result<TransferReport, ScpError> {
        self.execute(transport, prompt, None)
    }

    /// As [`run`](Self::run), showing a progress bar per file on `display`
    pub fn run_with_progress<T: Transport>(
        self,
        transport: &T,
        prompt: &mut dyn CredentialPrompt,
        display: &MultiProgress,
    ) -> Result<TransferReport, ScpError> {
        self.execute(transport, prompt, Some(display))
    }

    fn execute<T: Transport>(
        self,
        transport: &T,
        prompt: &mut dyn CredentialPrompt,
        display: Option<&MultiProgress>,
    ) -> Result<TransferReport, ScpError> {
        let target = self.target();
        let _guard = trace_span!("TRANSFER", host = %target).entered();
        let start = Instant::now();

        let mut session = SessionGuard(transport.connect(&target, prompt)?);
        debug!("connected to {target}");

        let mut files = Vec::with_capacity(self.files.len());
        for pair in &self.files {
            let bytes = send_one(&mut *session, pair, self.eof_policy, display)?;
            files.push(FileReport {
                local: pair.local.clone(),
                remote: pair.remote.clone(),
                bytes,
            });
        }
        drop(session);

        Ok(TransferReport {
            files,
            elapsed: start.elapsed(),
        })
    }
}

/// Sends one file on a fresh exec channel. Returns the number of content bytes sent.
fn send_one<S: Session>(
    session: &mut S,
    pair: &FilePair,
    eof_policy: EofPolicy,
    display: Option<&MultiProgress>,
) -> Result<u64, ScpError> {
    let _guard = trace_span!("PUT", filename = %pair.local.display()).entered();
    let local_error = |e: std::io::Error| ScpError::local(pair.local.clone(), e);

    let file = File::open(&pair.local).map_err(local_error)?;
    let meta = file.metadata().map_err(local_error)?;
    let unit = FileUnit::new(&pair.local, &meta)
        .map_err(|e| ScpError::from((pair.local.clone(), e)))?;
    trace!("{unit:?}");

    let mut channel = ChannelGuard(session.exec(&sink_command(&pair.remote))?);
    let progress = progress_bar_for(display, &unit);
    let result = ProtocolChannel::new(&mut *channel, eof_policy).send_file(
        &unit,
        BufReader::new(file),
        &progress,
    );
    progress.finish_and_clear();
    result.map_err(|e| ScpError::from_channel(pair.local.clone(), e))?;
    trace!("complete");
    Ok(unit.length)
}

fn progress_bar_for(display: Option<&MultiProgress>, unit: &FileUnit) -> ProgressBar {
    let Some(display) = display else {
        return ProgressBar::hidden();
    };
    let style = ProgressStyle::with_template(progress_style_for(
        &console::Term::stderr(),
        unit.name.len(),
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    display.add(
        ProgressBar::new(unit.length)
            .with_style(style)
            .with_message(unit.name.clone())
            .with_finish(ProgressFinish::AndClear),
    )
}
