//! One-shot hide/extract workflow (C3).
//!
//! Grounded in the legacy `hide_file`/`extract_file` pair: load the cover
//! image, compute the extension from the secret's path, serialize the
//! container, and write a lossless PNG (hide); the mirror image for
//! extract. Both run single-threaded with exclusively-owned buffers — no
//! locking is needed outside a mount.

use std::path::{Path, PathBuf};

use crate::container::{self, ParsedContainer};
use crate::error::{StegoError, StegoResult};
use crate::fs_state::MAX_FILE_SIZE;
use crate::image_io;

/// Reserved slack (in bytes) subtracted from capacity before accepting a
/// secret file, so capacity reporting stays conservative relative to the
/// exact bit-for-bit minimum. Matches spec's documented 64-byte reserve.
const CAPACITY_RESERVE_BYTES: u64 = 64;

/// Extension substring after the last `.` in `path`, truncated to
/// [`container::MAX_EXT_LENGTH`] bytes. No dot, or a dot as the first
/// character (a dotfile, not an extension), yields an empty extension.
pub fn extension_of(path: &Path) -> Vec<u8> {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return Vec::new(),
    };
    let Some(dot) = name.rfind('.') else { return Vec::new() };
    if dot == 0 {
        return Vec::new();
    }
    let ext = &name[dot + 1..];
    ext.as_bytes()[..ext.len().min(container::MAX_EXT_LENGTH as usize)].to_vec()
}

/// Embed `secret_file_path`'s contents into `cover_image_path`, writing the
/// result to `output_path` as a lossless PNG.
pub fn hide(cover_image_path: &Path, secret_file_path: &Path, output_path: &Path) -> StegoResult<()> {
    let (img, width, height) = image_io::load(cover_image_path)?;
    let mut buf = img.into_raw();

    let secret = std::fs::read(secret_file_path)?;
    if secret.len() as u64 > MAX_FILE_SIZE {
        return Err(StegoError::TooLarge { requested: secret.len() as u64, capacity: MAX_FILE_SIZE });
    }

    let extension = extension_of(secret_file_path);
    let capacity = container::capacity_bits(buf.len());
    let needed_bits = 72 + 8 * extension.len() as u64 + 8 * secret.len() as u64;
    if needed_bits > capacity.saturating_sub(8 * CAPACITY_RESERVE_BYTES) {
        return Err(StegoError::TooLarge {
            requested: needed_bits / 8,
            capacity: capacity / 8 - CAPACITY_RESERVE_BYTES,
        });
    }

    container::serialize(&mut buf, &extension, &secret)?;

    let out_img = image::RgbImage::from_raw(width, height, buf)
        .expect("buffer length preserved from load");
    // On encode failure nothing has been written to `output_path`;
    // `save_png` only touches disk on success.
    image_io::save_png(output_path, &out_img)?;
    Ok(())
}

/// Default output path for `hide` when none is given on the CLI:
/// `./stego_<basename(secret)>.png`.
pub fn default_hide_output(secret_file_path: &Path) -> PathBuf {
    let base = secret_file_path.file_name().map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hidden".to_string());
    PathBuf::from(format!("stego_{base}.png"))
}

pub struct ExtractedFile {
    pub data: Vec<u8>,
    pub extension: Vec<u8>,
}

/// Recover the payload hidden in `stego_image_path`.
pub fn extract(stego_image_path: &Path) -> StegoResult<ExtractedFile> {
    let (img, _w, _h) = image_io::load(stego_image_path)?;
    let buf = img.into_raw();

    match container::parse(&buf)? {
        ParsedContainer::Empty => Err(StegoError::InvalidStegoImage),
        ParsedContainer::Populated { extension, payload_size, payload_offset, .. } => {
            let data = container::read_payload(&buf, payload_offset, payload_size);
            Ok(ExtractedFile { data, extension })
        }
    }
}

/// Where `extract` should write its output: `<prefix>.<ext>` when there is
/// an extension, else `<prefix>` verbatim.
pub fn extract_output_path(output_prefix: &Path, extension: &[u8]) -> PathBuf {
    if extension.is_empty() {
        output_prefix.to_path_buf()
    } else {
        let ext = String::from_utf8_lossy(extension);
        let mut s = output_prefix.as_os_str().to_os_string();
        s.push(".");
        s.push(ext.as_ref());
        PathBuf::from(s)
    }
}
