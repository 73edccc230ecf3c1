//! Configuration structure
// (c) 2024 Ross Younger

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use serde::{Deserialize, Serialize};
use struct_field_names_as_array::FieldNamesAsSlice;

use crate::util::derive_deftly_template_Optionalify;

use derive_deftly::Deftly;

/// Which SSH implementation carries the exec channels
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportKind {
    /// Built-in SSH client (libssh2)
    #[default]
    Libssh,
    /// The system `ssh` program, one process per file
    Openssh,
}

/// The set of configurable options supported by scpush.
///
/// **Note:** The implementation of `default()` for this struct returns scpush's hard-wired configuration defaults.
///
/// This structure uses the [Optionalify](derive_deftly_template_Optionalify) deftly macro to automatically
/// define the `Configuration_Optional` struct, which is the same but has all members of type `Option<whatever>`.
/// The CLI uses the `_Optional` version, so wherever the user does not provide a value,
/// values read from configuration files and system defaults obtain.
///
// Maintainer note: None of the members of this struct should be Option<anything>. That leads to sunspots in the CLI and strange warts (Some(Some(foo))).
#[derive(Deftly)]
#[derive_deftly(Optionalify)]
#[deftly(visibility = "pub(crate)")]
#[derive(Debug, Clone, PartialEq, Eq, Parser, Deserialize, Serialize, FieldNamesAsSlice)]
pub struct Configuration {
    // CONNECTION ======================================================================================
    /// The SSH port on the remote host [default: 22]
    #[arg(short = 'p', long, value_name("port"), help_heading("Connection"))]
    pub port: u16,

    /// The remote user name, where the destination does not specify `user@`.
    /// [default: the local login name]
    #[arg(short = 'u', long, value_name("name"), help_heading("Connection"))]
    pub user: String,

    /// Selects the SSH implementation [default: libssh]
    ///
    /// `libssh` is built in. `openssh` runs the system ssh client (see `--ssh`) once per file,
    /// and so honours your ssh configuration and agent; it does its own prompting.
    #[arg(long, value_name("kind"), help_heading("Connection"))]
    #[clap(value_enum)]
    pub transport: TransportKind,

    /// TCP connection timeout, in seconds; 0 means the operating system default [default: 30]
    ///
    /// Applies to the libssh transport only.
    #[arg(long, value_name("sec"), help_heading("Connection"))]
    pub timeout: u16,

    /// Specifies the ssh client program for the openssh transport [default: `ssh`]
    #[arg(long, value_name("program"), help_heading("Connection"))]
    pub ssh: String,

    /// Provides an additional option or argument to pass to the ssh client. [default: none]
    ///
    /// **On the command line** you must repeat `-S` for each argument.
    /// For example, to pass `-o Compression=yes` to ssh, specify: `-S -o -S Compression=yes`
    ///
    /// **In a configuration file** this field is an array of strings.
    /// For the same example: `ssh_options=["-o", "Compression=yes"]`
    #[arg(
        short = 'S',
        action,
        value_name("ssh-option"),
        allow_hyphen_values(true),
        help_heading("Connection")
    )]
    pub ssh_options: Vec<String>,

    // AUTHENTICATION ==================================================================================
    /// Private key file for public key authentication [default: ~/.ssh/id_rsa]
    ///
    /// Applies to the libssh transport only.
    #[arg(short = 'i', long, value_name("FILE"), help_heading("Authentication"))]
    pub identity: String,

    /// Host key store [default: ~/.ssh/known_hosts]
    ///
    /// Keys for hosts not yet listed are shown for confirmation and then added.
    /// Applies to the libssh transport only.
    #[arg(long, value_name("FILE"), help_heading("Authentication"))]
    pub known_hosts: String,

    // PROTOCOL ========================================================================================
    /// Treats the remote end closing the stream in place of an acknowledgement as a failure.
    /// [default: false]
    ///
    /// Traditional SCP clients carry on regardless.
    #[arg(
        long,
        action = clap::ArgAction::Set,
        num_args(0..=1),
        require_equals(true),
        default_missing_value("true"),
        value_name("bool"),
        help_heading("Protocol")
    )]
    pub strict_eof: bool,
}

/// Expands a leading `~`, falling back to the literal string
fn expand(path: &str) -> PathBuf {
    expanduser::expanduser(path).unwrap_or_else(|_| PathBuf::from(path))
}

impl Configuration {
    /// Accessor for `timeout`, as a Duration
    #[must_use]
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout.into())
    }

    /// The identity file, with `~` expanded
    #[must_use]
    pub fn identity_path(&self) -> PathBuf {
        expand(&self.identity)
    }

    /// The `known_hosts` file, with `~` expanded
    #[must_use]
    pub fn known_hosts_path(&self) -> PathBuf {
        expand(&self.known_hosts)
    }
}

impl Default for Configuration {
    /// **(Unusual!)**
    /// Returns scpush's hard-wired configuration defaults.
    fn default() -> Self {
        Self {
            port: 22,
            user: String::new(),
            transport: TransportKind::Libssh,
            timeout: 30,
            ssh: "ssh".into(),
            ssh_options: vec![],
            identity: "~/.ssh/id_rsa".into(),
            known_hosts: "~/.ssh/known_hosts".into(),
            strict_eof: false,
        }
    }
}
