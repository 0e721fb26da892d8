use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use stego::fuse_fs;

/// Mount a stego image as a FUSE filesystem
#[derive(Parser, Debug)]
#[command(about = "Mount a stego image as a filesystem")]
pub struct Cli {
    /// Image to mount
    image_path: PathBuf,

    /// Mountpoint
    mountpoint: PathBuf,

    /// Run in foreground instead of daemonizing into the background
    #[arg(short, long)]
    foreground: bool,

    /// Extra FUSE mount option, forwarded verbatim (may be repeated)
    #[arg(short = 'o', long = "option")]
    options: Vec<String>,
}

pub fn cmd_mount(cli: Cli) -> Result<()> {
    if !cli.foreground {
        log::warn!("background daemonization is not implemented; running in the foreground");
    }

    fuse_fs::mount(&cli.image_path, &cli.mountpoint, &cli.options)
        .with_context(|| format!("mounting {} at {}", cli.image_path.display(), cli.mountpoint.display()))
}
