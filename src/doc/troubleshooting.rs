// (c) 2024 Ross Younger

//! 🕵️ Troubleshooting
//!
//! ## General
//!
//! The `--debug` option reports information that may help you diagnose issues.
//!
//! This program also understands the `RUST_LOG` environment variable which might let you probe deeper.
//! Some possible settings for this variable are:
//!
//! * `scpush=trace` outputs tracing-level output from this crate, including every protocol step
//! * `trace` sets all the Rust components to trace mode
//!
//! `--show-config` tells you which settings are in force and where each one came from.
//!
//! ### Authentication fails
//!
//! The built-in (`libssh`) transport tries, in order: the identity file (`-i`), keyboard-interactive,
//! then password. It does not consult an ssh agent or your `~/.ssh/config`.
//! If you rely on either of those, use `--transport openssh`, which runs your system ssh client
//! and lets it do the prompting.
//!
//! ### Host key verification failed
//!
//! The host is listed in your `known_hosts` file with a different key. This may mean the host
//! has been reinstalled, or that something is intercepting your connection. Check with the
//! administrator, then remove the stale line from `known_hosts`.
//!
//! ### `remote error: scp: ...: No such file or directory`
//!
//! Messages beginning `remote error` or `remote fatal error` come from the `scp` process on the
//! remote host. The destination directory must already exist; scpush never creates directories.
//!
//! ### The transfer reports success but the file is missing or short
//!
//! Some servers close the channel where they should send an acknowledgement. By default this is
//! treated as success, which is what traditional clients do. Set `--strict-eof` (or
//! `strict_eof = true` in a configuration file) to have it reported as a failure instead.
