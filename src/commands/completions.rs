use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};

use crate::commands::Cli as RootCli;

/// Generate shell completion scripts
#[derive(Parser, Debug)]
#[command(about = "Generate shell completion scripts")]
pub struct Cli {
    shell: Shell,
}

pub fn cmd_completions(cli: Cli) {
    let mut cmd = RootCli::command();
    let name = cmd.get_name().to_string();
    generate(cli.shell, &mut cmd, name, &mut std::io::stdout());
}
