// (c) 2024 Ross Younger
//! # Configuration management
//!
//! scpush obtains run-time configuration from the following sources, in order:
//! 1. Command-line options
//! 2. The user's configuration file (typically `~/.scpush.toml`)
//! 3. The system-wide configuration file (typically `/etc/scpush.toml`)
//! 4. Hard-wired defaults
//!
//! Each option may appear in multiple places, but only the first match is used.
//!
//! **Note** Configuration file locations are platform-dependent.
//! To see what applies on the current platform, run `scpush --config-files`.
//!
//! ## File format
//!
//! Configuration files are [TOML](https://toml.io/). Field names are as in [Configuration].
//!
//! ### Example
//!
//! ```toml
//! # Our servers listen on a non-standard port
//! port = 2222
//! user = "deploy"
//! identity = "~/.ssh/deploy_ed25519"
//!
//! # Be picky about servers that hang up on us
//! strict_eof = true
//! ```
//!
//! ## Configurable options
//!
//! The full list of supported fields is defined by [Configuration].
//!
//! On the command line:
//! * `scpush --show-config` outputs a list of supported fields, their current values, and where each value came from.
//! * For an explanation of each field, refer to `scpush --help` .
//! * `scpush --config-files` outputs the list of configuration files for the current user and platform.

mod structure;
pub use structure::{Configuration, TransportKind};
pub(crate) use structure::Configuration_Optional;

mod manager;
pub use manager::Manager;

pub(crate) const BASE_CONFIG_FILENAME: &str = "scpush.toml";
