mod commands;

use std::process::{ExitCode, Termination};

use clap::Parser;
use commands::{Cli, Subcommands};

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    match cli.subcommands {
        Subcommands::Hide(c) => commands::cmd_hide(c).report(),
        Subcommands::Extract(c) => commands::cmd_extract(c).report(),
        Subcommands::Info(c) => commands::cmd_info(c).report(),
        #[cfg(feature = "fuse")]
        Subcommands::Mount(c) => commands::cmd_mount(c).report(),
        Subcommands::Completions(c) => {
            commands::cmd_completions(c);
            ExitCode::SUCCESS
        }
    }
}
