// scpush client main loop
// (c) 2024 Ross Younger

use std::str::FromStr as _;

use crate::cli::CliArgs;
use crate::config::{Configuration, Manager, TransportKind};
use crate::session::libssh::LibSsh;
use crate::session::openssh::OpenSsh;
use crate::session::prompt::{ConsolePrompt, TermConsole};
use crate::session::Transport;
use crate::util::stats::output_statistics;

use super::job::{FileSpec, TransferRequest};
use super::transfer::TransferReport;

use anyhow::Context as _;
use indicatif::MultiProgress;
use tracing::{debug, error, trace_span};

/// Resolves the configuration in force for this invocation
fn configuration(args: &CliArgs) -> anyhow::Result<Configuration> {
    let mut mgr = Manager::new();
    mgr.merge_provider(args.config.clone());
    mgr.get::<Configuration>()
        .context("failed to resolve configuration")
}

/// Turns the positional arguments into a request: every path but the last is a source
pub(crate) fn request_from(
    paths: &[String],
    config: &Configuration,
) -> anyhow::Result<TransferRequest> {
    let Some((destination, sources)) = paths.split_last() else {
        anyhow::bail!("source and destination must be specified");
    };
    // FileSpec parsing is infallible
    let parse = |s: &String| FileSpec::from_str(s).unwrap_or_default();
    let sources: Vec<FileSpec> = sources.iter().map(parse).collect();
    let request = TransferRequest::from_specs(&sources, &parse(destination), &config.user)?
        .port(config.port)
        .strict_eof(config.strict_eof);
    Ok(request)
}

fn send<T: Transport>(
    request: TransferRequest,
    transport: &T,
    display: &MultiProgress,
    quiet: bool,
) -> Result<TransferReport, crate::ScpError> {
    let mut prompt = ConsolePrompt::new(TermConsole::default());
    if quiet {
        request.run(transport, &mut prompt)
    } else {
        request.run_with_progress(transport, &mut prompt, display)
    }
}

/// Main client entrypoint
// Caution: As we are using ProgressBar, anything to be printed to console should use progress.println() !
pub(crate) fn client_main(args: &CliArgs, display: &MultiProgress) -> anyhow::Result<bool> {
    let _guard = trace_span!("CLIENT").entered();
    let config = configuration(args)?;
    let request = request_from(&args.paths, &config)?;
    debug!(
        "sending {} file(s) to {} via {}",
        request.files().len(),
        request.target(),
        config.transport
    );

    let result = match config.transport {
        TransportKind::Libssh => {
            let transport = LibSsh::new(config.identity_path(), config.known_hosts_path())
                .with_timeout(config.timeout_duration());
            send(request, &transport, display, args.quiet)
        }
        TransportKind::Openssh => {
            let transport = OpenSsh::new(config.ssh.clone(), config.ssh_options.clone());
            send(request, &transport, display, args.quiet)
        }
    };

    match result {
        Ok(report) => {
            if !args.quiet {
                output_statistics(&report, args.statistics);
            }
            Ok(true)
        }
        Err(e) => {
            error!("{e}");
            Ok(false)
        }
    }
}
