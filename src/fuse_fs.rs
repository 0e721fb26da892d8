//! FUSE mount (C5): `fuser::Filesystem` bridge over [`crate::fs_state::MountState`].
//!
//! A single process-wide mutex serializes every callback against the shared
//! image buffer and directory table: fuser spawns worker threads that call
//! back concurrently, and every operation here holds the lock for its whole
//! duration, so the effect is as if one operation ran at a time.
//!
//! Key design notes:
//! - Inode numbers: the on-image format has no notion of inodes. `ROOT_INO`
//!   is the flat directory; every file gets a stable inode assigned once at
//!   mount-parse or `create` time, since a `Vec` position shifts on unlink.
//! - No write-back cache: `write` mutates the shared image buffer directly,
//!   so `flush`/`fsync` are no-ops and the only blocking I/O is the final PNG
//!   encode in `destroy`.

use std::ffi::OsStr;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    Config, FileAttr, FileType, Filesystem, MountOption,
    ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite,
    Request, TimeOrNow,
    Errno, FileHandle, FopenFlags, Generation,
    INodeNo, OpenFlags,
    BsdFileFlags, WriteFlags, LockOwner,
};

use crate::container;
use crate::error::StegoError;
use crate::fs_state::{FileEntry, MountState, MAX_FILENAME_LENGTH, MAX_FILES, ROOT_INO};

const TTL: Duration = Duration::MAX;

fn err(e: StegoError) -> Errno {
    Errno::from_i32(e.errno())
}

fn file_attr(entry: &FileEntry) -> FileAttr {
    FileAttr {
        ino: INodeNo(entry.ino),
        size: entry.size,
        blocks: (entry.size + 511) / 512,
        atime: entry.atime,
        mtime: entry.mtime,
        ctime: entry.mtime,
        crtime: UNIX_EPOCH,
        kind: FileType::RegularFile,
        perm: (entry.mode & 0o7777) as u16,
        nlink: 1,
        uid: unsafe { libc::getuid() },
        gid: unsafe { libc::getgid() },
        rdev: 0,
        blksize: 512,
        flags: 0,
    }
}

fn root_attr() -> FileAttr {
    FileAttr {
        ino: INodeNo(ROOT_INO),
        size: 0,
        blocks: 0,
        atime: UNIX_EPOCH,
        mtime: UNIX_EPOCH,
        ctime: UNIX_EPOCH,
        crtime: UNIX_EPOCH,
        kind: FileType::Directory,
        perm: 0o755,
        nlink: 2,
        uid: unsafe { libc::getuid() },
        gid: unsafe { libc::getgid() },
        rdev: 0,
        blksize: 512,
        flags: 0,
    }
}

fn resolve_time(t: TimeOrNow) -> SystemTime {
    match t {
        TimeOrNow::Now => SystemTime::now(),
        TimeOrNow::SpecificTime(t) => t,
    }
}

pub struct StegoFs {
    state: Mutex<MountState>,
}

impl StegoFs {
    pub fn new(state: MountState) -> Self {
        StegoFs { state: Mutex::new(state) }
    }
}

impl Filesystem for StegoFs {
    fn init(&mut self, _req: &Request, _config: &mut fuser::KernelConfig) -> std::io::Result<()> {
        log::info!("stego fuse: mount established");
        Ok(())
    }

    fn destroy(&mut self) {
        let mut state = self.state.lock().unwrap();
        if let Err(e) = state.persist() {
            // destroy() has no return path to the mount(8) caller; logging
            // is the only way this failure is surfaced.
            log::error!("stego fuse: failed to persist image on unmount: {e}");
        }
    }

    fn lookup(&self, _req: &Request, parent: INodeNo, name: &OsStr, reply: ReplyEntry) {
        if parent.0 != ROOT_INO {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        }
        let Some(name) = name.to_str() else {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        };

        let state = self.state.lock().unwrap();
        match state.get(name) {
            Some(entry) => reply.entry(&TTL, &file_attr(entry), Generation(0)),
            None => reply.error(Errno::from_i32(libc::ENOENT)),
        }
    }

    fn getattr(&self, _req: &Request, ino: INodeNo, _fh: Option<FileHandle>, reply: ReplyAttr) {
        if ino.0 == ROOT_INO {
            reply.attr(&TTL, &root_attr());
            return;
        }

        let state = self.state.lock().unwrap();
        match state.get_by_ino(ino.0) {
            Some(entry) => reply.attr(&TTL, &file_attr(entry)),
            None => reply.error(Errno::from_i32(libc::ENOENT)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &self,
        _req: &Request,
        ino: INodeNo,
        mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<FileHandle>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<BsdFileFlags>,
        reply: ReplyAttr,
    ) {
        let mut state = self.state.lock().unwrap();
        let Some(name) = state.get_by_ino(ino.0).map(|e| e.name.clone()) else {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        };

        if let Some(mode) = mode {
            if let Err(e) = state.chmod(&name, mode) {
                reply.error(err(e));
                return;
            }
        }
        if let Some(size) = size {
            if let Err(e) = state.truncate(&name, size) {
                reply.error(err(e));
                return;
            }
        }
        if atime.is_some() || mtime.is_some() {
            let a = atime.map(resolve_time);
            let m = mtime.map(resolve_time);
            if let Err(e) = state.utimens(&name, a, m) {
                reply.error(err(e));
                return;
            }
        }

        match state.get(&name) {
            Some(entry) => reply.attr(&TTL, &file_attr(entry)),
            None => reply.error(Errno::from_i32(libc::ENOENT)),
        }
    }

    fn open(&self, _req: &Request, ino: INodeNo, _flags: OpenFlags, reply: ReplyOpen) {
        let state = self.state.lock().unwrap();
        if ino.0 != ROOT_INO && state.get_by_ino(ino.0).is_none() {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        }
        reply.opened(FileHandle(0), FopenFlags::empty());
    }

    fn create(
        &self,
        _req: &Request,
        parent: INodeNo,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        if parent.0 != ROOT_INO {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        }
        let Some(name) = name.to_str() else {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        };

        let mut state = self.state.lock().unwrap();
        if let Err(e) = state.create(name, mode & 0o7777) {
            reply.error(err(e));
            return;
        }

        match state.get(name) {
            Some(entry) => reply.created(&TTL, &file_attr(entry), Generation(0), FileHandle(0), FopenFlags::empty()),
            None => reply.error(Errno::from_i32(libc::EIO)),
        }
    }

    fn read(
        &self,
        _req: &Request,
        ino: INodeNo,
        _fh: FileHandle,
        offset: u64,
        size: u32,
        _flags: OpenFlags,
        _lock_owner: Option<LockOwner>,
        reply: ReplyData,
    ) {
        let state = self.state.lock().unwrap();
        let Some(name) = state.get_by_ino(ino.0).map(|e| e.name.clone()) else {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        };

        match state.read(&name, size as u64, offset) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(err(e)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &self,
        _req: &Request,
        ino: INodeNo,
        _fh: FileHandle,
        offset: u64,
        data: &[u8],
        _write_flags: WriteFlags,
        _flags: OpenFlags,
        _lock_owner: Option<LockOwner>,
        reply: ReplyWrite,
    ) {
        let mut state = self.state.lock().unwrap();
        let Some(name) = state.get_by_ino(ino.0).map(|e| e.name.clone()) else {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        };

        match state.write(&name, data, offset) {
            Ok(n) => reply.written(n as u32),
            Err(e) => reply.error(err(e)),
        }
    }

    fn unlink(&self, _req: &Request, parent: INodeNo, name: &OsStr, reply: ReplyEmpty) {
        if parent.0 != ROOT_INO {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        }
        let Some(name) = name.to_str() else {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        };

        let mut state = self.state.lock().unwrap();
        match state.unlink(name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(err(e)),
        }
    }

    fn readdir(
        &self,
        _req: &Request,
        ino: INodeNo,
        _fh: FileHandle,
        offset: u64,
        mut reply: ReplyDirectory,
    ) {
        if ino.0 != ROOT_INO {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        }

        let state = self.state.lock().unwrap();
        let mut pos = offset;

        if pos == 0 {
            if reply.add(INodeNo(ROOT_INO), 1, FileType::Directory, ".") {
                reply.ok();
                return;
            }
            pos = 1;
        }
        if pos == 1 {
            if reply.add(INodeNo(ROOT_INO), 2, FileType::Directory, "..") {
                reply.ok();
                return;
            }
            pos = 2;
        }

        let skip = (pos - 2) as usize;
        for (i, entry) in state.files.iter().enumerate().skip(skip) {
            let next_pos = (i + 3) as u64;
            if reply.add(INodeNo(entry.ino), next_pos, FileType::RegularFile, entry.name.as_str()) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&self, _req: &Request, _ino: INodeNo, reply: ReplyStatfs) {
        let state = self.state.lock().unwrap();
        let capacity_bytes = container::capacity_bits(state.image_data.len()) / 8;
        let used: u64 = state.files.iter().map(|f| f.size).sum();
        let free = capacity_bytes.saturating_sub(used);

        reply.statfs(
            capacity_bytes,
            free,
            free,
            state.files.len() as u64,
            (MAX_FILES - state.files.len()) as u64,
            1,
            MAX_FILENAME_LENGTH as u32,
            1,
        );
    }

    fn flush(&self, _req: &Request, ino: INodeNo, _fh: FileHandle, _lock_owner: LockOwner, reply: ReplyEmpty) {
        let state = self.state.lock().unwrap();
        if ino.0 != ROOT_INO && state.get_by_ino(ino.0).is_none() {
            reply.error(Errno::from_i32(libc::ENOENT));
            return;
        }
        reply.ok();
    }

    fn fsync(&self, _req: &Request, _ino: INodeNo, _fh: FileHandle, _datasync: bool, reply: ReplyEmpty) {
        reply.ok();
    }

    fn access(&self, _req: &Request, ino: INodeNo, _mask: i32, reply: ReplyEmpty) {
        let state = self.state.lock().unwrap();
        if ino.0 == ROOT_INO || state.get_by_ino(ino.0).is_some() {
            reply.ok();
        } else {
            reply.error(Errno::from_i32(libc::ENOENT));
        }
    }
}

/// Mount `image_path` at `mountpoint`, blocking until unmounted.
pub fn mount(image_path: &std::path::Path, mountpoint: &std::path::Path, extra_opts: &[String]) -> crate::error::StegoResult<()> {
    let state = MountState::open(image_path)?;
    let fs = StegoFs::new(state);

    let mut config = Config::default();
    config.mount_options = vec![
        MountOption::FSName("stego".to_string()),
        MountOption::CUSTOM("subtype=stego".to_string()),
    ];
    for opt in extra_opts {
        config.mount_options.push(MountOption::CUSTOM(opt.clone()));
    }

    log::info!("mounting {} at {}", image_path.display(), mountpoint.display());
    fuser::mount2(fs, mountpoint, &config).map_err(StegoError::Io)?;
    Ok(())
}
