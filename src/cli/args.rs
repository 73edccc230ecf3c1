// scpush command-line arguments
// (c) 2024 Ross Younger

use clap::{ArgAction::SetTrue, Parser};

use crate::config::Configuration_Optional;

/// Options that switch us into another mode i.e. which don't require source/destination arguments
pub(crate) const MODE_OPTIONS: &[&str] = &["show_config", "config_files"];

#[derive(Debug, Parser, Clone)]
#[command(
    author,
    version(env!("SCPUSH_VERSION_STRING")),
    about,
    before_help = "e.g.   scpush a.txt b.txt deploy@server:/srv/incoming/",
    infer_long_args(true)
)]
#[command(help_template(
    "\
{name} version {version}
{about-with-newline}
{usage-heading} {usage}
{before-help}
{all-args}{after-help}
"
))]
#[command(styles = super::styles::CLAP_STYLES)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CliArgs {
    // MODE SELECTION ======================================================================
    /// Outputs the configuration that would apply, then exits.
    ///
    /// Shows each setting together with where it came from.
    #[arg(long, help_heading("Configuration"), action(SetTrue))]
    pub show_config: bool,

    /// Outputs the paths of the configuration files read, then exits.
    #[arg(long, help_heading("Configuration"), action(SetTrue))]
    pub config_files: bool,

    // CLIENT OPTIONS ======================================================================
    /// Quiet mode
    ///
    /// Switches off progress display and statistics; reports only errors
    #[arg(short, long, action, conflicts_with("debug"))]
    pub quiet: bool,

    /// Outputs per-file transfer statistics
    #[arg(short = 's', long, alias("stats"), action, conflicts_with("quiet"))]
    pub statistics: bool,

    // DEBUG ===============================================================================
    /// Enables detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=scpush=trace` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, help_heading("Debug"))]
    pub debug: bool,

    /// Logs to a file
    ///
    /// By default the log receives everything printed to stderr.
    /// To override this behaviour, set the environment variable `RUST_LOG_FILE_DETAIL` (same semantics as `RUST_LOG`).
    #[arg(short('l'), long, action, help_heading("Debug"), value_name("FILE"))]
    pub log_file: Option<String>,

    // CONFIGURABLE OPTIONS ================================================================
    #[command(flatten)]
    pub config: Configuration_Optional,

    // POSITIONAL ARGUMENTS ================================================================
    /// Local files to send, followed by the remote destination.
    ///
    /// Specify the destination as HOST:PATH or USER@HOST:PATH; or simply HOST: or USER@HOST:
    /// to send to your home directory there.
    /// With more than one source, the destination ought to be a directory.
    #[arg(
        conflicts_with_all(MODE_OPTIONS),
        required_unless_present_any(MODE_OPTIONS),
        num_args(2..),
        value_name = "SOURCE... [USER@]HOST:DESTINATION"
    )]
    pub paths: Vec<String>,
}
