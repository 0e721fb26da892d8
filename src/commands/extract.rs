use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use stego::hide_extract;

/// Recover a file previously hidden with `stego hide`
#[derive(Parser, Debug)]
#[command(about = "Recover a file hidden in a stego image")]
pub struct Cli {
    /// Stego image to extract from
    stego_image_path: PathBuf,

    /// Output path prefix; the recovered extension (if any) is appended
    output_prefix: PathBuf,
}

pub fn cmd_extract(cli: Cli) -> Result<()> {
    let extracted = hide_extract::extract(&cli.stego_image_path)
        .with_context(|| format!("extracting from {}", cli.stego_image_path.display()))?;
    let output = hide_extract::extract_output_path(&cli.output_prefix, &extracted.extension);

    std::fs::write(&output, &extracted.data)
        .with_context(|| format!("writing {}", output.display()))?;

    log::debug!("extracted {} bytes to {}", extracted.data.len(), output.display());
    println!("wrote {}", output.display());
    Ok(())
}
