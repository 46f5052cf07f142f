//! Command: print a shell completion script.
use std::io::{self, Write};

use clap::CommandFactory as _;
use clap_complete::Shell;

use crate::cli::{Cli, CompletionsOpts};

/// Write the completion script for `opts.shell` to stdout.
pub fn run(opts: &CompletionsOpts) {
    write(opts.shell, &mut io::stdout());
}

/// Write the completion script for `shell` to `out`.
pub fn write(shell: Shell, out: &mut dyn Write) {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "assetctl", out);
}
