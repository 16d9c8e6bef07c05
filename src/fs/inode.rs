//! On-disk inode and directory-entry records.
//!
//! Both are fixed-width, `repr(C)` records with explicit `encode`/`decode`
//! routines rather than raw pointer casts: the core runs in safe std Rust,
//! not as a kernel overlay on physical memory, so [`zerocopy`] does the
//! byte-exact (host-endian) conversion instead.

use zerocopy::{AsBytes, FromBytes};

use crate::param::{NAME_FIELD, NAME_MAX, NDIRECT};

/// 0 = directory, 1 = regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum InodeType {
    Dir = 0,
    File = 1,
}

impl InodeType {
    fn from_raw(raw: u16) -> Self {
        match raw {
            0 => InodeType::Dir,
            1 => InodeType::File,
            other => panic!("corrupt inode: unknown type {other}"),
        }
    }
}

/// Cached file-status attributes mirrored alongside the inode (mode, mtime,
/// size mirror — §3).
#[repr(C)]
#[derive(Debug, Clone, Copy, AsBytes, FromBytes, Default)]
pub struct VStat {
    pub mode: u32,
    pub mtime: i64,
    pub size: u64,
}

/// Raw on-disk inode record, byte-exact with [`DINODE_SIZE`].
#[repr(C)]
#[derive(Debug, Clone, Copy, AsBytes, FromBytes)]
struct RawDinode {
    ino: u32,
    valid: u8,
    typ: u16,
    _pad: u8,
    size: u64,
    link: u32,
    direct_ptr: [i32; NDIRECT],
    vstat: VStat,
}

pub const DINODE_SIZE: usize = core::mem::size_of::<RawDinode>();

/// Safe, typed view of an inode record. `decode`/`encode` are the sole
/// boundary between this type and its on-disk byte layout.
#[derive(Debug, Clone, Copy)]
pub struct Dinode {
    pub ino: u32,
    pub valid: bool,
    pub typ: InodeType,
    pub size: u64,
    pub link: u32,
    pub direct_ptr: [i32; NDIRECT],
    pub vstat: VStat,
}

impl Dinode {
    /// A freshly allocated, empty inode of the given type.
    pub fn new(ino: u32, typ: InodeType, mode: u32) -> Self {
        let link = match typ {
            InodeType::Dir => 2,
            InodeType::File => 1,
        };
        Self {
            ino,
            valid: true,
            typ,
            size: 0,
            link,
            direct_ptr: [-1; NDIRECT],
            vstat: VStat {
                mode,
                mtime: 0,
                size: 0,
            },
        }
    }

    pub fn encode(&self) -> [u8; DINODE_SIZE] {
        let raw = RawDinode {
            ino: self.ino,
            valid: self.valid as u8,
            typ: self.typ as u16,
            _pad: 0,
            size: self.size,
            link: self.link,
            direct_ptr: self.direct_ptr,
            vstat: self.vstat,
        };
        let mut buf = [0u8; DINODE_SIZE];
        buf.copy_from_slice(raw.as_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let raw = RawDinode::read_from(bytes).expect("inode decode: size mismatch");
        Self {
            ino: raw.ino,
            valid: raw.valid != 0,
            typ: InodeType::from_raw(raw.typ),
            size: raw.size,
            link: raw.link,
            direct_ptr: raw.direct_ptr,
            vstat: raw.vstat,
        }
    }

    /// First direct-pointer slot that is `-1` (unused), if any. Slots are
    /// prefix-compact (§3 invariant), so this is also "next slot to fill".
    pub fn first_free_direct_slot(&self) -> Option<usize> {
        self.direct_ptr.iter().position(|&p| p == -1)
    }
}

/// Raw on-disk directory-entry record.
#[repr(C)]
#[derive(Clone, Copy, AsBytes, FromBytes)]
struct RawDirent {
    valid: i8,
    _pad0: u8,
    ino: u32,
    len: u16,
    name: [u8; NAME_FIELD],
}

pub const DIRENT_SIZE: usize = core::mem::size_of::<RawDirent>();

/// Safe, typed view of a directory-entry record. `valid == 0` means
/// occupied, `valid == -1` means a free slot (§3) — not a bool, to mirror
/// the on-disk tri-state sentinel the spec prescribes.
#[derive(Debug, Clone, Copy)]
pub struct Dirent {
    pub occupied: bool,
    pub ino: u32,
    pub name_len: u16,
    name: [u8; NAME_FIELD],
}

impl Dirent {
    pub fn free() -> Self {
        Self {
            occupied: false,
            ino: 0,
            name_len: 0,
            name: [0u8; NAME_FIELD],
        }
    }

    pub fn occupied(ino: u32, name: &[u8]) -> crate::error::Result<Self> {
        if name.is_empty() || name.len() > NAME_MAX {
            return Err(crate::error::FsError::NameTooLong);
        }
        let mut buf = [0u8; NAME_FIELD];
        buf[..name.len()].copy_from_slice(name);
        Ok(Self {
            occupied: true,
            ino,
            name_len: name.len() as u16,
            name: buf,
        })
    }

    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len as usize]
    }

    pub fn encode(&self) -> [u8; DIRENT_SIZE] {
        let raw = RawDirent {
            valid: if self.occupied { 0 } else { -1 },
            _pad0: 0,
            ino: self.ino,
            len: self.name_len,
            name: self.name,
        };
        let mut buf = [0u8; DIRENT_SIZE];
        buf.copy_from_slice(raw.as_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let raw = RawDirent::read_from(bytes).expect("dirent decode: size mismatch");
        Self {
            occupied: raw.valid == 0,
            ino: raw.ino,
            name_len: raw.len,
            name: raw.name,
        }
    }
}
