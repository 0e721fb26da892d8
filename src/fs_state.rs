//! In-memory filesystem state (C4) and its mutating operations (the pure,
//! FUSE-independent half of C5) plus persistence (C6).
//!
//! [`MountState`] owns the decoded image buffer and the derived directory
//! table for the lifetime of a mount. Every operation here is a plain
//! function over `&mut MountState`; [`crate::fuse_fs`] is the thin adapter
//! that takes the process-wide mutex and translates `fuser` callbacks into
//! calls against it.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::codec;
use crate::container::{self, ParsedContainer, DEFAULT_FILE_NAME};
use crate::error::{StegoError, StegoResult};
use crate::image_io;

pub const MAX_FILES: usize = 256;
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
/// Including the trailing NUL, per spec; the usable name is one byte shorter.
pub const MAX_FILENAME_LENGTH: usize = 255;

const DEFAULT_MODE: u32 = 0o644;
/// Bits consumed by a header whose extension is empty — the shape `persist`
/// always writes. Matches `container::HEADER_FIXED_BITS`, duplicated here
/// because it is also the starting point for `total_data_size` on a fresh
/// (never-hidden-into) image.
const EMPTY_HEADER_BITS: u64 = 72;

/// Inode number of the mount's single directory, `/`.
pub const ROOT_INO: u64 = 1;

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    /// Bit address of this file's data region.
    pub offset: u64,
    pub mtime: SystemTime,
    pub atime: SystemTime,
    pub mode: u32,
    /// Stable FUSE inode number, assigned once at creation and never
    /// reused — the on-image format has no notion of inode numbers, so
    /// this is purely an in-memory mapping for the FUSE bridge (C5).
    pub ino: u64,
}

pub struct MountState {
    pub files: Vec<FileEntry>,
    /// Bit address of the first free bit after the last allocated file.
    pub total_data_size: u64,
    pub dirty: bool,
    pub image_path: PathBuf,
    pub image_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    next_ino: u64,
}

impl MountState {
    /// Load `image_path`, decode it, and parse the container header. A
    /// magic mismatch is not an error here — it means an empty mount.
    pub fn open(image_path: &Path) -> StegoResult<Self> {
        let (img, width, height) = image_io::load(image_path)?;
        let image_data = img.into_raw();

        let (files, total_data_size) = match container::parse(&image_data)? {
            ParsedContainer::Empty => (Vec::new(), EMPTY_HEADER_BITS),
            ParsedContainer::Populated { payload_size, payload_offset, .. } => {
                let now = SystemTime::now();
                let entry = FileEntry {
                    name: DEFAULT_FILE_NAME.to_string(),
                    size: payload_size as u64,
                    offset: payload_offset as u64,
                    mtime: now,
                    atime: now,
                    mode: DEFAULT_MODE,
                    ino: ROOT_INO + 1,
                };
                let end = entry.offset + 8 * entry.size;
                (vec![entry], end)
            }
        };
        let next_ino = files.iter().map(|f| f.ino).max().unwrap_or(ROOT_INO) + 1;

        Ok(MountState {
            files,
            total_data_size,
            dirty: false,
            image_path: image_path.to_path_buf(),
            image_data,
            width,
            height,
            next_ino,
        })
    }

    pub fn capacity_bits(&self) -> u64 {
        container::capacity_bits(self.image_data.len())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn get_by_ino(&self, ino: u64) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.ino == ino)
    }

    pub fn readdir_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }

    /// Upper bound (bit address) this file's data region may grow into:
    /// the next file's offset, or total image capacity if this is the last
    /// file. Keeps distinct files' data regions from overlapping (invariant
    /// 2) without pre-reserving a fixed region per file, which would make
    /// small cover images unable to hold even one file.
    fn growth_ceiling_bits(&self, idx: usize) -> u64 {
        self.files
            .get(idx + 1)
            .map(|next| next.offset)
            .unwrap_or_else(|| self.capacity_bits())
    }

    pub fn create(&mut self, name: &str, mode: u32) -> StegoResult<()> {
        if self.files.len() >= MAX_FILES {
            return Err(StegoError::NoSpace(MAX_FILES));
        }
        if name.len() + 1 > MAX_FILENAME_LENGTH {
            return Err(StegoError::NameTooLong(MAX_FILENAME_LENGTH));
        }
        if self.index_of(name).is_some() {
            // create() on an existing name is a truncating open in POSIX;
            // this design has no separate open-mode state, so treat it as
            // a no-op success against the existing entry.
            return Ok(());
        }

        let now = SystemTime::now();
        let ino = self.next_ino;
        self.next_ino += 1;
        self.files.push(FileEntry {
            name: name.to_string(),
            size: 0,
            offset: self.total_data_size,
            mtime: now,
            atime: now,
            mode,
            ino,
        });
        self.dirty = true;
        Ok(())
    }

    pub fn write(&mut self, name: &str, buf: &[u8], offset: u64) -> StegoResult<usize> {
        let idx = self.index_of(name).ok_or(StegoError::NotFound)?;
        let new_size = (offset + buf.len() as u64).max(self.files[idx].size);

        if new_size > MAX_FILE_SIZE {
            return Err(StegoError::TooLarge { requested: new_size, capacity: MAX_FILE_SIZE });
        }
        let ceiling = self.growth_ceiling_bits(idx);
        let file_offset = self.files[idx].offset;
        if file_offset + 8 * new_size > ceiling {
            return Err(StegoError::TooLarge {
                requested: new_size,
                capacity: (ceiling - file_offset) / 8,
            });
        }

        let start_bit = file_offset + 8 * offset;
        let mut p = start_bit as usize;
        for &b in buf {
            codec::write_bits(&mut self.image_data, b as u64, 8, &mut p);
        }

        let file = &mut self.files[idx];
        file.size = new_size;
        file.mtime = SystemTime::now();
        if idx + 1 == self.files.len() {
            self.total_data_size = file_offset + 8 * new_size;
        }
        self.dirty = true;
        Ok(buf.len())
    }

    pub fn read(&self, name: &str, size: u64, offset: u64) -> StegoResult<Vec<u8>> {
        let file = self.get(name).ok_or(StegoError::NotFound)?;
        if offset >= file.size {
            return Ok(Vec::new());
        }
        let clamped = size.min(file.size - offset);
        let start_bit = (file.offset + 8 * offset) as usize;
        let mut p = start_bit;
        let mut out = Vec::with_capacity(clamped as usize);
        for _ in 0..clamped {
            out.push(codec::read_bits(&self.image_data, 8, &mut p) as u8);
        }
        Ok(out)
    }

    pub fn unlink(&mut self, name: &str) -> StegoResult<()> {
        let idx = self.index_of(name).ok_or(StegoError::NotFound)?;
        // Shift later entries down; the vacated data region is not
        // reclaimed (documented limitation, spec §9).
        self.files.remove(idx);
        self.dirty = true;
        Ok(())
    }

    pub fn truncate(&mut self, name: &str, new_size: u64) -> StegoResult<()> {
        if new_size > MAX_FILE_SIZE {
            return Err(StegoError::TooLarge { requested: new_size, capacity: MAX_FILE_SIZE });
        }
        let idx = self.index_of(name).ok_or(StegoError::NotFound)?;
        let ceiling = self.growth_ceiling_bits(idx);
        let file_offset = self.files[idx].offset;
        if file_offset + 8 * new_size > ceiling {
            return Err(StegoError::TooLarge {
                requested: new_size,
                capacity: (ceiling - file_offset) / 8,
            });
        }

        self.files[idx].size = new_size;
        self.files[idx].mtime = SystemTime::now();
        if idx + 1 == self.files.len() {
            self.total_data_size = file_offset + 8 * new_size;
        }
        self.dirty = true;
        Ok(())
    }

    pub fn chmod(&mut self, name: &str, mode: u32) -> StegoResult<()> {
        let file = self.files.iter_mut().find(|f| f.name == name).ok_or(StegoError::NotFound)?;
        file.mode = mode;
        self.dirty = true;
        Ok(())
    }

    pub fn utimens(&mut self, name: &str, atime: Option<SystemTime>, mtime: Option<SystemTime>) -> StegoResult<()> {
        let file = self.files.iter_mut().find(|f| f.name == name).ok_or(StegoError::NotFound)?;
        if let Some(a) = atime {
            file.atime = a;
        }
        if let Some(m) = mtime {
            file.mtime = m;
        }
        self.dirty = true;
        Ok(())
    }

    /// Re-encode the header for the first file (name is not itself
    /// persisted — the on-image format has no directory chunk, spec §9) and
    /// write the image back to `image_path` as a lossless PNG. No-op when
    /// nothing has changed since the last successful persist.
    pub fn persist(&mut self) -> StegoResult<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(first) = self.files.first() {
            let name = first.name.clone();
            let size = first.size;
            let payload = self.read(&name, size, 0)?;
            container::serialize(&mut self.image_data, &[], &payload)?;
        }

        let img = image::RgbImage::from_raw(self.width, self.height, self.image_data.clone())
            .expect("image_data length matches width*height*3 by construction");
        image_io::save_png(&self.image_path, &img)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_state(width: u32, height: u32) -> MountState {
        blank_state_with_capacity((width * height * 3) as usize, width, height)
    }

    /// A state with an exact buffer length, for tests that care about raw
    /// capacity arithmetic rather than plausible image dimensions.
    fn blank_state_with_capacity(capacity_bytes: usize, width: u32, height: u32) -> MountState {
        MountState {
            files: Vec::new(),
            total_data_size: EMPTY_HEADER_BITS,
            dirty: false,
            image_path: PathBuf::from("/dev/null"),
            image_data: vec![0u8; capacity_bytes],
            width,
            height,
            next_ino: ROOT_INO + 1,
        }
    }

    #[test]
    fn fresh_mount_has_no_files() {
        let st = blank_state(64, 64);
        assert_eq!(st.readdir_names().count(), 0);
    }

    #[test]
    fn create_then_write_then_read_roundtrips() {
        let mut st = blank_state(64, 64);
        st.create("a", 0o644).unwrap();
        let n = st.write("a", b"abc", 0).unwrap();
        assert_eq!(n, 3);
        assert_eq!(st.read("a", 3, 0).unwrap(), b"abc");
        assert_eq!(st.get("a").unwrap().size, 3);
    }

    #[test]
    fn read_past_eof_returns_empty() {
        let mut st = blank_state(64, 64);
        st.create("a", 0o644).unwrap();
        st.write("a", b"abc", 0).unwrap();
        assert_eq!(st.read("a", 10, 3).unwrap(), Vec::<u8>::new());
        assert_eq!(st.read("a", 10, 100).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn read_clamps_to_remaining_size() {
        let mut st = blank_state(64, 64);
        st.create("a", 0o644).unwrap();
        st.write("a", b"hello", 0).unwrap();
        assert_eq!(st.read("a", 100, 2).unwrap(), b"llo");
    }

    #[test]
    fn write_extends_size_but_never_shrinks_it() {
        let mut st = blank_state(64, 64);
        st.create("a", 0o644).unwrap();
        st.write("a", b"hello world", 0).unwrap();
        st.write("a", b"X", 0).unwrap();
        assert_eq!(st.get("a").unwrap().size, 11);
    }

    #[test]
    fn operations_on_missing_file_return_not_found() {
        let mut st = blank_state(64, 64);
        assert!(matches!(st.write("nope", b"x", 0), Err(StegoError::NotFound)));
        assert!(matches!(st.read("nope", 1, 0), Err(StegoError::NotFound)));
        assert!(matches!(st.unlink("nope"), Err(StegoError::NotFound)));
        assert!(matches!(st.truncate("nope", 1), Err(StegoError::NotFound)));
        assert!(matches!(st.chmod("nope", 0o600), Err(StegoError::NotFound)));
    }

    #[test]
    fn unlink_removes_entry_preserving_order_of_the_rest() {
        let mut st = blank_state(64, 64);
        st.create("a", 0o644).unwrap();
        st.create("b", 0o644).unwrap();
        st.create("c", 0o644).unwrap();
        st.unlink("b").unwrap();
        let names: Vec<&str> = st.readdir_names().collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn unlink_does_not_reclaim_capacity() {
        let mut st = blank_state(64, 64);
        st.create("a", 0o644).unwrap();
        st.write("a", b"hello", 0).unwrap();
        let before = st.total_data_size;
        st.unlink("a").unwrap();
        assert_eq!(st.total_data_size, before);
    }

    #[test]
    fn create_at_max_files_minus_one_succeeds_at_max_fails() {
        let mut st = blank_state(4096, 4096);
        for i in 0..MAX_FILES - 1 {
            st.create(&format!("f{i}"), 0o644).unwrap();
        }
        assert_eq!(st.files.len(), MAX_FILES - 1);
        st.create("last", 0o644).unwrap();
        assert_eq!(st.files.len(), MAX_FILES);
        let err = st.create("overflow", 0o644).unwrap_err();
        assert!(matches!(err, StegoError::NoSpace(_)));
    }

    #[test]
    fn truncate_to_max_file_size_succeeds_one_byte_more_fails() {
        // Capacity comfortably larger than MAX_FILE_SIZE so the image-size
        // ceiling never shadows the MAX_FILE_SIZE ceiling under test.
        let cap = MAX_FILE_SIZE as usize + 4096;
        let mut st = blank_state_with_capacity(cap, 1, 1);
        st.create("a", 0o644).unwrap();
        st.truncate("a", MAX_FILE_SIZE).unwrap();
        assert_eq!(st.get("a").unwrap().size, MAX_FILE_SIZE);

        let mut st2 = blank_state_with_capacity(cap, 1, 1);
        st2.create("a", 0o644).unwrap();
        let err = st2.truncate("a", MAX_FILE_SIZE + 1).unwrap_err();
        assert!(matches!(err, StegoError::TooLarge { .. }));
    }

    #[test]
    fn write_beyond_image_capacity_is_rejected() {
        let mut st = blank_state(8, 8); // 192 bits = 24 bytes capacity
        st.create("a", 0o644).unwrap();
        let err = st.write("a", &vec![0u8; 100], 0).unwrap_err();
        assert!(matches!(err, StegoError::TooLarge { .. }));
    }

    #[test]
    fn second_file_does_not_overlap_first() {
        let mut st = blank_state(64, 64);
        st.create("a", 0o644).unwrap();
        st.write("a", b"hello", 0).unwrap();
        st.create("b", 0o644).unwrap();
        st.write("b", b"world", 0).unwrap();

        assert_eq!(st.read("a", 5, 0).unwrap(), b"hello");
        assert_eq!(st.read("b", 5, 0).unwrap(), b"world");

        // growing "a" past "b"'s offset must fail, not silently corrupt "b".
        let a_off = st.get("a").unwrap().offset;
        let b_off = st.get("b").unwrap().offset;
        let room_bytes = (b_off - a_off) / 8;
        let err = st.write("a", &vec![0u8; room_bytes as usize + 1], 0).unwrap_err();
        assert!(matches!(err, StegoError::TooLarge { .. }));
    }

    #[test]
    fn persist_is_a_noop_when_not_dirty() {
        let mut st = blank_state(64, 64);
        st.image_path = PathBuf::from("/nonexistent/path/should/not/be/touched.png");
        assert!(!st.dirty);
        st.persist().unwrap();
    }
}
