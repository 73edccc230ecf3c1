//! Recording transport double for tests
// (c) 2024 Ross Younger

use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{Read, Write},
    rc::Rc,
};

use super::{CredentialPrompt, ExecChannel, Session, Target, Transport, TransportError};

/// Everything the code under test did, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Connect(Target),
    Exec(String),
    Write(Vec<u8>),
    Flush,
    Read(Option<u8>),
    Close,
    Disconnect,
    SessionDisconnect,
}

type Log = Rc<RefCell<Vec<Event>>>;

/// How one exec channel will behave
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    replies: Vec<u8>,
    fail_after: Option<usize>,
    truncate: Option<std::path::PathBuf>,
}

impl Script {
    pub(crate) fn replying(replies: &[u8]) -> Self {
        Self {
            replies: replies.to_vec(),
            ..Self::default()
        }
    }

    /// Empties the given file at the moment the channel is opened
    pub(crate) fn truncating<P: Into<std::path::PathBuf>>(mut self, path: P) -> Self {
        self.truncate = Some(path.into());
        self
    }

    /// Writes fail once this many bytes have been accepted
    pub(crate) fn failing_after(mut self, bytes: usize) -> Self {
        self.fail_after = Some(bytes);
        self
    }
}

fn events_of(log: &Log) -> Vec<Event> {
    log.borrow().clone()
}

/// Groups the bytes written into flush-delimited units
fn units_of(log: &Log) -> Vec<Vec<u8>> {
    let mut units = Vec::new();
    let mut current = Vec::new();
    for event in log.borrow().iter() {
        match event {
            Event::Write(bytes) => current.extend_from_slice(bytes),
            Event::Flush if !current.is_empty() => units.push(std::mem::take(&mut current)),
            _ => (),
        }
    }
    if !current.is_empty() {
        units.push(current);
    }
    units
}

#[derive(Debug)]
pub(crate) struct MockChannel {
    log: Log,
    replies: VecDeque<u8>,
    written: usize,
    fail_after: Option<usize>,
}

impl MockChannel {
    /// A standalone channel with its own log
    pub(crate) fn new(replies: &[u8]) -> Self {
        Self::scripted(Rc::default(), Script::replying(replies))
    }

    fn scripted(log: Log, script: Script) -> Self {
        Self {
            log,
            replies: script.replies.into(),
            written: 0,
            fail_after: script.fail_after,
        }
    }

    pub(crate) fn failing_after(mut self, bytes: usize) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        events_of(&self.log)
    }

    pub(crate) fn units(&self) -> Vec<Vec<u8>> {
        units_of(&self.log)
    }

    pub(crate) fn count<F: Fn(&Event) -> bool>(&self, predicate: F) -> usize {
        self.log.borrow().iter().filter(|e| predicate(e)).count()
    }

    fn record(&self, event: Event) {
        self.log.borrow_mut().push(event);
    }
}

impl Read for MockChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let byte = self.replies.pop_front();
        self.record(Event::Read(byte));
        Ok(byte.map_or(0, |b| {
            buf[0] = b;
            1
        }))
    }
}

impl Write for MockChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(limit) = self.fail_after {
            if self.written + buf.len() > limit {
                return Err(std::io::ErrorKind::BrokenPipe.into());
            }
        }
        self.written += buf.len();
        self.record(Event::Write(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.record(Event::Flush);
        Ok(())
    }
}

impl ExecChannel for MockChannel {
    fn close(&mut self) -> std::io::Result<()> {
        self.record(Event::Close);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.record(Event::Disconnect);
    }
}

/// Hands out one scripted channel per `exec`, in order.
/// Once the scripts run out, channels reply with end-of-stream.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    log: Log,
    scripts: RefCell<VecDeque<Script>>,
    refuse: bool,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn channel(self, script: Script) -> Self {
        self.scripts.borrow_mut().push_back(script);
        self
    }

    /// `connect` fails
    pub(crate) fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        events_of(&self.log)
    }

    pub(crate) fn units(&self) -> Vec<Vec<u8>> {
        units_of(&self.log)
    }

    pub(crate) fn count<F: Fn(&Event) -> bool>(&self, predicate: F) -> usize {
        self.log.borrow().iter().filter(|e| predicate(e)).count()
    }
}

#[derive(Debug)]
pub(crate) struct MockSession {
    log: Log,
    scripts: VecDeque<Script>,
}

impl Transport for MockTransport {
    type Session = MockSession;

    fn connect(
        &self,
        target: &Target,
        _prompt: &mut dyn CredentialPrompt,
    ) -> Result<Self::Session, TransportError> {
        if self.refuse {
            return Err(TransportError::Connect {
                address: target.host.clone(),
                source: std::io::ErrorKind::ConnectionRefused.into(),
            });
        }
        self.log.borrow_mut().push(Event::Connect(target.clone()));
        Ok(MockSession {
            log: self.log.clone(),
            scripts: self.scripts.take(),
        })
    }
}

impl Session for MockSession {
    type Channel = MockChannel;

    fn exec(&mut self, command: &str) -> Result<Self::Channel, TransportError> {
        self.log.borrow_mut().push(Event::Exec(command.to_owned()));
        let script = self.scripts.pop_front().unwrap_or_default();
        if let Some(path) = &script.truncate {
            drop(std::fs::File::create(path).unwrap());
        }
        Ok(MockChannel::scripted(self.log.clone(), script))
    }

    fn disconnect(&mut self) {
        self.log.borrow_mut().push(Event::SessionDisconnect);
    }
}

/// A prompt that must never be consulted
#[derive(Debug, Clone, Copy)]
pub(crate) struct NoPrompt;

impl CredentialPrompt for NoPrompt {
    fn passphrase(&mut self, message: &str) -> std::io::Result<String> {
        panic!("unexpected passphrase prompt: {message}");
    }

    fn password(&mut self, message: &str) -> std::io::Result<String> {
        panic!("unexpected password prompt: {message}");
    }

    fn yes_no(&mut self, message: &str) -> std::io::Result<bool> {
        panic!("unexpected question: {message}");
    }

    fn show_message(&mut self, message: &str) {
        panic!("unexpected message: {message}");
    }
}
