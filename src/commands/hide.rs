use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use stego::hide_extract;

/// Hide a file inside a cover image's least-significant bits
#[derive(Parser, Debug)]
#[command(about = "Hide a file inside a cover image")]
pub struct Cli {
    /// Cover image to embed into (PNG, or any format the `image` crate decodes)
    image_path: PathBuf,

    /// File whose contents get hidden
    secret_file_path: PathBuf,

    /// Output path for the stego image; defaults to ./stego_<secret name>.png
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn cmd_hide(cli: Cli) -> Result<()> {
    let output = cli.output.unwrap_or_else(|| hide_extract::default_hide_output(&cli.secret_file_path));

    hide_extract::hide(&cli.image_path, &cli.secret_file_path, &output)
        .with_context(|| format!("hiding {} in {}", cli.secret_file_path.display(), cli.image_path.display()))?;

    log::debug!("wrote {}", output.display());
    println!("wrote {}", output.display());
    Ok(())
}
