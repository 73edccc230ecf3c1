// Main CLI entrypoint
// (c) 2024 Ross Younger

use std::process::ExitCode;

use super::args::CliArgs;

use crate::{
    client::{client_main, MAX_UPDATE_FPS},
    config::{Configuration, Manager},
    util::setup_tracing,
};
use clap::Parser;
use indicatif::{MultiProgress, ProgressDrawTarget};

/// Main CLI entrypoint
pub fn cli() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();
    if args.config_files {
        println!("{:?}", Manager::config_files());
        return Ok(ExitCode::SUCCESS);
    }
    if args.show_config {
        let mut mgr = Manager::new();
        mgr.merge_provider(args.config.clone());
        println!("{}", mgr.to_display_adapter::<Configuration>(true));
        return Ok(ExitCode::SUCCESS);
    }
    run_client(&args)
}

fn run_client(args: &CliArgs) -> anyhow::Result<ExitCode> {
    let progress = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(
        MAX_UPDATE_FPS,
    ));
    let trace_level = if args.debug {
        "trace"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };
    setup_tracing(trace_level, Some(&progress), args.log_file.as_deref())
        .inspect_err(|e| eprintln!("{e:?}"))?;

    client_main(args, &progress)
        .inspect_err(|e| tracing::error!("{e:#}"))
        .or_else(|_| Ok(false))
        .map(|success| {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        })
}
