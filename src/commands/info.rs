use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use stego::container::{self, ParsedContainer};
use stego::image_io;
use stego::util::fmt_bytes_human;

/// Inspect a cover/stego image without extracting anything
#[derive(Parser, Debug)]
#[command(about = "Report capacity and payload status of an image")]
pub struct Cli {
    image_path: PathBuf,
}

pub fn cmd_info(cli: Cli) -> Result<()> {
    let (img, width, height) = image_io::load(&cli.image_path)
        .with_context(|| format!("reading {}", cli.image_path.display()))?;
    let buf = img.into_raw();
    let capacity = container::capacity_bits(buf.len()) / 8;

    println!("image:    {}", cli.image_path.display());
    println!("size:     {width}x{height}");
    println!("capacity: {}", fmt_bytes_human(capacity));

    match container::parse(&buf)? {
        ParsedContainer::Empty => println!("payload:  none"),
        ParsedContainer::Populated { payload_size, extension, .. } => {
            let ext = String::from_utf8_lossy(&extension);
            println!("payload:  {} bytes ({})", payload_size, fmt_bytes_human(payload_size as u64));
            if ext.is_empty() {
                println!("extension: (none)");
            } else {
                println!("extension: {ext}");
            }
        }
    }

    Ok(())
}
