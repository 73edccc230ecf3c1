//! OS abstraction layer
// (c) 2024 Ross Younger

use std::path::PathBuf;

/// General platform abstraction trait.
/// The active implementation should be pulled into this crate
/// Implementations should be called `Platform`, e.g. [unix::Platform].
///
/// Usage:
/// ```
///    use scpush::os::Platform;
///    use scpush::os::AbstractPlatform as _;
///    println!("{:?}", Platform::system_config_path());
/// ```
pub trait AbstractPlatform {
    /// The directory to store user configuration files in.
    ///
    /// On Unix platforms this is the traditional home directory.
    ///
    /// If somehow we could not determine the directory to use, returns None.
    fn user_config_dir() -> Option<PathBuf>;

    /// The absolute path to the user configuration file, if one is defined on this platform.
    fn user_config_path() -> Option<PathBuf>;

    /// The absolute path to the system configuration file, if one is defined on this platform.
    fn system_config_path() -> Option<PathBuf>;

    /// The login name of the user running this process, if known
    fn local_user() -> Option<String>;
}

#[cfg(any(unix, doc))]
mod unix;

#[cfg(any(unix, doc))]
pub use unix::*;

static_assertions::assert_cfg!(unix, "This OS is not yet supported");
