// (c) 2024 Ross Younger

//! 📤 scpush pushes local files to a remote host over SSH, using the SCP sink protocol.
//!
//! ## Overview
//!
//! - 🔧 Drop-in replacement for the common `scp file host:dest` push case
//! - 🔐 Host keys are checked against `known_hosts`; new hosts are confirmed interactively
//! - 🔌 Choice of a built-in SSH client or the system `ssh` program
//! - 📜 Layered configuration: defaults, system and user files, then the command line
//!
//! ## Usage
//!
//! ```text
//! scpush a.txt b.txt deploy@server:/srv/incoming/
//! ```
//!
//! Every file is sent over its own `scp -t` exec channel within a single SSH session.
//! The first failure abandons the rest of the request; the session is always torn down.
//!
//! ## As a library
//!
//! Build a [`TransferRequest`](client::TransferRequest) and hand it a [`Transport`](session::Transport)
//! and a [`CredentialPrompt`](session::CredentialPrompt).
//! The protocol engine itself is in [`protocol::channel`] and works over any
//! [`ExecChannel`](session::ExecChannel).
//!
//! ## Feature flags
#![doc = document_features::document_features!()]

#[doc(hidden)]
pub use derive_deftly;

mod cli;
pub use cli::cli;

pub mod client;
pub mod config;
pub mod doc;
pub mod error;
pub use error::ScpError;
pub mod os;
pub mod protocol;
pub mod session;
pub mod util;
