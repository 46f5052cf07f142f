//! assetctl command-line entry point.

use std::process::ExitCode;

use clap::Parser;

use assetctl::cli::{Cli, Command};
use assetctl::commands;
use assetctl::error::exit_code_for;
use assetctl::logging::{Log as _, Logger, init_subscriber};

fn main() -> ExitCode {
    enable_ansi_support::enable_ansi_support().ok();
    let args = Cli::parse();
    let name = args.command.name();
    init_subscriber(args.verbose, name);
    let log = Logger::new(name);

    let result = match &args.command {
        Command::Install(opts) => commands::install::run(&args.global, opts, &log),
        Command::Update(opts) => commands::update::run(&args.global, opts, &log),
        Command::Uninstall(opts) => commands::uninstall::run(&args.global, opts, &log),
        Command::Status(opts) => commands::status::run(&args.global, opts, &log),
        Command::Completions(opts) => {
            commands::completions::run(opts);
            Ok(())
        }
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log.error(&format!("{err:#}"));
            ExitCode::from(exit_code_for(&err))
        }
    }
}
