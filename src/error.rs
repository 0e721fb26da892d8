//! Error taxonomy shared by the codec, container, filesystem, and CLI layers.
//!
//! One-shot commands propagate [`StegoError`] through `anyhow::Result` via
//! `?`; the FUSE layer converts it to a negative errno with [`StegoError::errno`].

use thiserror::Error;

/// Every failure kind named in the container/filesystem design.
#[derive(Debug, Error)]
pub enum StegoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("not a valid stego image (magic mismatch)")]
    InvalidStegoImage,

    #[error("corrupt container: {0}")]
    CorruptContainer(String),

    #[error("payload too large: {requested} bytes requested, {capacity} bytes available")]
    TooLarge { requested: u64, capacity: u64 },

    #[error("no such file")]
    NotFound,

    #[error("directory is full (max {0} files)")]
    NoSpace(usize),

    #[error("name too long (max {0} bytes including NUL)")]
    NameTooLong(usize),
}

pub type StegoResult<T> = Result<T, StegoError>;

impl StegoError {
    /// Map to a negative `errno` value, for returning to `fuser` callbacks.
    pub fn errno(&self) -> i32 {
        match self {
            StegoError::Io(_) => libc::EIO,
            StegoError::Image(_) => libc::EIO,
            StegoError::InvalidStegoImage => libc::EINVAL,
            StegoError::CorruptContainer(_) => libc::EINVAL,
            StegoError::TooLarge { .. } => libc::EFBIG,
            StegoError::NotFound => libc::ENOENT,
            StegoError::NoSpace(_) => libc::ENOSPC,
            StegoError::NameTooLong(_) => libc::ENAMETOOLONG,
        }
    }
}
