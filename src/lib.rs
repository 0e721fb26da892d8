//! Core library for the `stego` LSB steganographic file container.
//!
//! Layout mirrors the component breakdown of the on-disk/in-image design:
//! [`codec`] is the bit-level primitive (C1), [`container`] is the on-image
//! layout (C2), [`hide_extract`] is the one-shot CLI workflow (C3),
//! [`fs_state`] is the in-memory mount state (C4), [`fuse_fs`] serves FUSE
//! callbacks against it (C5), and persistence (C6) lives on
//! [`fs_state::MountState::persist`].

pub mod codec;
pub mod container;
pub mod error;
pub mod fs_state;
#[cfg(feature = "fuse")]
pub mod fuse_fs;
pub mod hide_extract;
pub mod image_io;
pub mod util;

pub use error::{StegoError, StegoResult};
