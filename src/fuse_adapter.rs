//! Translates kernel upcalls (`fuser::Filesystem`) into calls against the
//! path-based [`Filesystem`] surface, mapping [`FsError`] to `errno` and
//! [`Stat`] to `fuser::FileAttr` (§4.9, §6 "Ambient addition — FUSE adapter
//! surface"). This layer holds no storage-engine logic of its own: every
//! method here is a mechanical lookup-path, call-surface, fill-reply.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

use fuser::{
    FileAttr, FileType, Filesystem as FuseFilesystem, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, FUSE_ROOT_ID,
};
use log::{debug, error};

use crate::error::FsError;
use crate::fs::{Filesystem, InodeType};
use crate::stat::{FileKind, Stat};

const TTL: Duration = Duration::from_secs(1);

/// Every fallible surface call funnels through here before `reply.error`,
/// so an I/O failure surfaced to the kernel is never silently swallowed.
fn errno(err: FsError) -> i32 {
    if matches!(err, FsError::Io(_)) {
        error!("{err}");
    }
    err.errno()
}

/// `fuser` addresses objects by `u64` inode number starting at
/// [`FUSE_ROOT_ID`] (1); the core addresses them by path. This table is the
/// seam between the two: every `lookup`/`readdir` entry that crosses the
/// boundary is assigned a FUSE ino (core ino + 1, since the core reserves 0
/// for root and FUSE reserves 1) and its path cached here for later calls
/// that only carry the ino (`getattr`, `read`, `write`, ...).
pub struct FuseAdapter {
    fs: Filesystem,
    paths: HashMap<u64, PathBuf>,
}

fn fuse_ino(core_ino: u32) -> u64 {
    core_ino as u64 + 1
}

fn join(parent: &std::path::Path, name: &OsStr) -> PathBuf {
    parent.join(name)
}

fn path_str(p: &std::path::Path) -> String {
    // The core works in `/`-separated UTF-8 paths only (§6); non-UTF-8 or
    // non-`/`-separated components never reach here because `fuser` always
    // hands us host path segments we ourselves constructed.
    p.to_string_lossy().replace('\\', "/")
}

impl FuseAdapter {
    pub fn new(fs: Filesystem) -> Self {
        let mut paths = HashMap::new();
        paths.insert(FUSE_ROOT_ID, PathBuf::from("/"));
        Self { fs, paths }
    }

    fn path_of(&self, ino: u64) -> Option<&std::path::Path> {
        self.paths.get(&ino).map(|p| p.as_path())
    }

    fn remember(&mut self, ino: u64, path: PathBuf) {
        self.paths.insert(ino, path);
    }

    fn attr_of(&self, stat: &Stat) -> FileAttr {
        FileAttr {
            ino: fuse_ino(stat.ino),
            size: stat.size,
            blocks: stat.blocks(),
            atime: stat.mtime(),
            mtime: stat.mtime(),
            ctime: stat.mtime(),
            crtime: stat.mtime(),
            kind: match stat.kind {
                FileKind::Directory => FileType::Directory,
                FileKind::File => FileType::RegularFile,
            },
            perm: stat.perm,
            nlink: stat.nlink,
            uid: 0,
            gid: 0,
            rdev: 0,
            blksize: stat.blksize,
            flags: 0,
        }
    }
}

impl FuseFilesystem for FuseAdapter {
    fn destroy(&mut self) {
        debug!("fuse destroy");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_path) = self.path_of(parent).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };
        let child_path = join(&parent_path, name);
        match self.fs.getattr(&path_str(&child_path)) {
            Ok(stat) => {
                let ino = fuse_ino(stat.ino);
                self.remember(ino, child_path);
                reply.entry(&TTL, &self.attr_of(&stat), 0);
            }
            Err(err) => reply.error(errno(err)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let Some(path) = self.path_of(ino).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.getattr(&path_str(&path)) {
            Ok(stat) => reply.attr(&TTL, &self.attr_of(&stat)),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let Some(path) = self.path_of(ino).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.opendir(&path_str(&path)) {
            Ok(_) => reply.opened(0, 0),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(dir_path) = self.path_of(ino).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };

        let mut entries: Vec<(u64, FileType, String, PathBuf)> = vec![
            (ino, FileType::Directory, ".".to_string(), dir_path.clone()),
        ];
        let result = self.fs.readdir(&path_str(&dir_path), |name, child_ino, child_typ| {
            let name = String::from_utf8_lossy(name).into_owned();
            let child_path = join(&dir_path, OsStr::new(&name));
            let kind = match child_typ {
                InodeType::Dir => FileType::Directory,
                InodeType::File => FileType::RegularFile,
            };
            entries.push((fuse_ino(child_ino), kind, name, child_path));
        });
        if let Err(err) = result {
            reply.error(errno(err));
            return;
        }

        for (i, (entry_ino, kind, name, path)) in entries.into_iter().enumerate().skip(offset as usize) {
            self.paths.entry(entry_ino).or_insert(path);
            if reply.add(entry_ino, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(parent_path) = self.path_of(parent).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };
        let child_path = join(&parent_path, name);
        match self.fs.mkdir(&path_str(&child_path), mode) {
            Ok(stat) => {
                let ino = fuse_ino(stat.ino);
                self.remember(ino, child_path);
                reply.entry(&TTL, &self.attr_of(&stat), 0);
            }
            Err(err) => reply.error(errno(err)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(parent_path) = self.path_of(parent).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };
        let child_path = join(&parent_path, name);
        match self.fs.rmdir(&path_str(&child_path)) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let Some(parent_path) = self.path_of(parent).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };
        let child_path = join(&parent_path, name);
        match self.fs.create(&path_str(&child_path), mode) {
            Ok(stat) => {
                let ino = fuse_ino(stat.ino);
                self.remember(ino, child_path);
                reply.created(&TTL, &self.attr_of(&stat), 0, 0, 0);
            }
            Err(err) => reply.error(errno(err)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let Some(path) = self.path_of(ino).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.open(&path_str(&path)) {
            Ok(_) => reply.opened(0, 0),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.path_of(ino).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };
        let mut buf = vec![0u8; size as usize];
        match self.fs.read(&path_str(&path), offset as u64, &mut buf) {
            Ok(n) => reply.data(&buf[..n]),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(path) = self.path_of(ino).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.write(&path_str(&path), offset as u64, data) {
            Ok(n) => reply.written(n as u32),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(parent_path) = self.path_of(parent).map(|p| p.to_path_buf()) else {
            reply.error(libc::ENOENT);
            return;
        };
        let child_path = join(&parent_path, name);
        match self.fs.unlink(&path_str(&child_path)) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }
}
