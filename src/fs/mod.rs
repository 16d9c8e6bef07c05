//! The storage engine: a `Filesystem` value owning the device handle and
//! both in-memory bitmap mirrors, plus the per-operation surface that the
//! FUSE adapter and test harness call (§2 item 8, §9 "global mutable state
//! re-architected as a single value").

mod alloc;
mod dir;
mod file;
mod inode;
mod path;
mod superblock;

pub use inode::{Dinode, InodeType, VStat};
pub use superblock::Superblock;

use std::path::Path;
use std::time::SystemTime;

use log::{debug, info};

use crate::device::BlockDevice;
use crate::error::{FsError, Result};
use crate::param::{BLOCK_SIZE, ROOTINO};
use crate::stat::{FileKind, Stat};

/// Owns the backing device and the two bitmap mirrors. There is exactly one
/// writer, so no interior mutability is needed beyond `&mut self` on
/// mutating methods (§5).
pub struct Filesystem {
    device: BlockDevice,
    superblock: Superblock,
    inode_bitmap: [u8; BLOCK_SIZE],
    data_bitmap: [u8; BLOCK_SIZE],
}

impl Filesystem {
    /// Lay out a fresh image: write the superblock, zero both bitmaps, mark
    /// the root inode allocated, and write its inode record.
    pub fn mkfs(path: &Path) -> Result<Self> {
        let superblock = Superblock::new();
        info!(
            "mkfs: {} ({} blocks total)",
            path.display(),
            superblock.total_blocks()
        );
        let device = BlockDevice::init(path, superblock.total_blocks() as u64)?;

        let mut fs = Self {
            device,
            superblock,
            inode_bitmap: [0u8; BLOCK_SIZE],
            data_bitmap: [0u8; BLOCK_SIZE],
        };

        fs.device.write(Superblock::self_block(), &superblock.encode())?;
        fs.device.write(superblock.i_bitmap_blk, &fs.inode_bitmap)?;
        fs.device.write(superblock.d_bitmap_blk, &fs.data_bitmap)?;

        let root_ino = fs.alloc_inode()?;
        debug_assert_eq!(root_ino, ROOTINO);
        let root = Dinode::new(root_ino, InodeType::Dir, 0o755);
        fs.write_inode(&root)?;

        Ok(fs)
    }

    /// Open an existing image, running `mkfs` if none exists yet (§6 mount
    /// discovery).
    pub fn init(path: &Path) -> Result<Self> {
        if let Some(device) = BlockDevice::open(path) {
            debug!("init: opening existing image {}", path.display());
            let mut sb_block = crate::device::zero_block();
            device.read(Superblock::self_block(), &mut sb_block)?;
            let superblock = Superblock::decode(&sb_block)?;

            let mut inode_bitmap = [0u8; BLOCK_SIZE];
            device.read(superblock.i_bitmap_blk, &mut inode_bitmap)?;
            let mut data_bitmap = [0u8; BLOCK_SIZE];
            device.read(superblock.d_bitmap_blk, &mut data_bitmap)?;

            Ok(Self {
                device,
                superblock,
                inode_bitmap,
                data_bitmap,
            })
        } else {
            info!("init: no image at {}, formatting", path.display());
            Self::mkfs(path)
        }
    }

    /// Release in-memory state and close the device. Both bitmaps are
    /// already write-through, so there is nothing left to flush (§5).
    pub fn destroy(self) {
        debug!("destroy");
        self.device.close();
    }

    fn stat_of(&self, inode: &Dinode) -> Stat {
        Stat {
            ino: inode.ino,
            kind: match inode.typ {
                InodeType::Dir => FileKind::Directory,
                InodeType::File => FileKind::File,
            },
            size: inode.size,
            nlink: inode.link,
            perm: (inode.vstat.mode & 0o7777) as u16,
            blksize: BLOCK_SIZE as u32,
        }
    }

    /// `getattr(path)`.
    pub fn getattr(&self, path: &str) -> Result<Stat> {
        debug!("getattr({path})");
        let inode = self.resolve(path)?;
        Ok(self.stat_of(&inode))
    }

    /// `opendir(path)`: confirms `path` exists and is a directory.
    pub fn opendir(&self, path: &str) -> Result<Stat> {
        debug!("opendir({path})");
        let inode = self.resolve(path)?;
        if inode.typ != InodeType::Dir {
            return Err(FsError::NotADirectory);
        }
        Ok(self.stat_of(&inode))
    }

    /// `readdir(path, emit)`: emits every live entry's `(name, ino, type)`.
    pub fn readdir(&self, path: &str, emit: impl FnMut(&[u8], u32, InodeType)) -> Result<()> {
        debug!("readdir({path})");
        let dir = self.resolve(path)?;
        if dir.typ != InodeType::Dir {
            return Err(FsError::NotADirectory);
        }
        self.dir_iter(&dir, emit)
    }

    /// `mkdir(path, mode)`.
    pub fn mkdir(&mut self, path: &str, mode: u32) -> Result<Stat> {
        debug!("mkdir({path})");
        let (mut parent, basename) = self.resolve_parent(path)?;
        if self.dir_lookup(&parent, basename.as_bytes()).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let ino = self.alloc_inode()?;
        let inode = Dinode::new(ino, InodeType::Dir, mode);
        self.write_inode(&inode)?;
        self.dir_add(&mut parent, ino, basename.as_bytes())?;
        Ok(self.stat_of(&inode))
    }

    /// `rmdir(path)`. Rejects non-empty directories (ambient addition, §7).
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        debug!("rmdir({path})");
        let (mut parent, basename) = self.resolve_parent(path)?;
        let entry = self.dir_lookup(&parent, basename.as_bytes())?;
        let target = self.read_inode(entry.ino)?;
        if target.typ != InodeType::Dir {
            return Err(FsError::NotADirectory);
        }
        if !self.dir_is_empty(&target)? {
            return Err(FsError::DirectoryNotEmpty);
        }
        self.dir_remove(&mut parent, basename.as_bytes())
    }

    /// `create(path, mode)`: creates an empty regular file.
    pub fn create(&mut self, path: &str, mode: u32) -> Result<Stat> {
        debug!("create({path})");
        let (mut parent, basename) = self.resolve_parent(path)?;
        if self.dir_lookup(&parent, basename.as_bytes()).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let ino = self.alloc_inode()?;
        let inode = Dinode::new(ino, InodeType::File, mode);
        self.write_inode(&inode)?;
        self.dir_add(&mut parent, ino, basename.as_bytes())?;
        Ok(self.stat_of(&inode))
    }

    /// `open(path)`: confirms existence and that the target is a regular file.
    pub fn open(&self, path: &str) -> Result<Stat> {
        debug!("open({path})");
        let inode = self.resolve(path)?;
        if inode.typ != InodeType::File {
            return Err(FsError::IsADirectory);
        }
        Ok(self.stat_of(&inode))
    }

    /// `read(path, buf, off)`.
    pub fn read(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize> {
        debug!("read({path}, off={offset}, len={})", buf.len());
        let inode = self.resolve(path)?;
        if inode.typ != InodeType::File {
            return Err(FsError::IsADirectory);
        }
        self.file_read(&inode, offset, buf)
    }

    /// `write(path, buf, off)`.
    pub fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> Result<usize> {
        debug!("write({path}, off={offset}, len={})", data.len());
        let mut inode = self.resolve(path)?;
        if inode.typ != InodeType::File {
            return Err(FsError::IsADirectory);
        }
        self.file_write(&mut inode, offset, data)
    }

    /// `unlink(path)`.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        debug!("unlink({path})");
        let (mut parent, basename) = self.resolve_parent(path)?;
        let entry = self.dir_lookup(&parent, basename.as_bytes())?;
        let target = self.read_inode(entry.ino)?;
        if target.typ != InodeType::File {
            return Err(FsError::IsADirectory);
        }
        self.dir_remove(&mut parent, basename.as_bytes())
    }

    pub fn mtime_now() -> SystemTime {
        SystemTime::now()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::fresh_fs;

    #[test]
    fn root_getattr_is_a_directory() {
        let fs = fresh_fs();
        let stat = fs.getattr("/").unwrap();
        assert_eq!(stat.kind, crate::stat::FileKind::Directory);
        assert_eq!(stat.nlink, 2);
    }

    #[test]
    fn create_write_read_round_trip() {
        let mut fs = fresh_fs();
        fs.create("/a.txt", 0o644).unwrap();
        let written = fs.write("/a.txt", 0, b"hello").unwrap();
        assert_eq!(written, 5);
        assert_eq!(fs.getattr("/a.txt").unwrap().size, 5);

        let mut buf = [0u8; 5];
        let read = fs.read("/a.txt", 0, &mut buf).unwrap();
        assert_eq!(read, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn mkdir_create_readdir_and_duplicate_mkdir() {
        let mut fs = fresh_fs();
        fs.mkdir("/d", 0o755).unwrap();
        fs.create("/d/x", 0o644).unwrap();

        let mut names = Vec::new();
        fs.readdir("/d", |name, _ino, _typ| names.push(name.to_vec()))
            .unwrap();
        assert!(names.iter().any(|n| n == b"x"));

        let err = fs.mkdir("/d", 0o755).unwrap_err();
        assert!(matches!(err, crate::error::FsError::AlreadyExists));
    }

    #[test]
    fn write_spanning_two_blocks() {
        let mut fs = fresh_fs();
        fs.create("/big", 0o644).unwrap();
        let data = vec![7u8; crate::param::BLOCK_SIZE * 2];
        let written = fs.write("/big", 0, &data).unwrap();
        assert_eq!(written, data.len());
        assert_eq!(fs.getattr("/big").unwrap().size, data.len() as u64);
    }

    #[test]
    fn write_creates_hole_then_read_before_it_is_zero_bytes() {
        let mut fs = fresh_fs();
        fs.create("/holey", 0o644).unwrap();
        fs.write("/holey", crate::param::BLOCK_SIZE as u64, &[1u8; 100])
            .unwrap();

        let mut buf = [0u8; 100];
        let read = fs.read("/holey", 0, &mut buf).unwrap();
        assert_eq!(read, 0);
    }

    #[test]
    fn unlink_frees_inode_for_reuse() {
        let mut fs = fresh_fs();
        let created = fs.create("/a.txt", 0o644).unwrap();
        fs.unlink("/a.txt").unwrap();
        assert!(fs.getattr("/a.txt").is_err());

        let recreated = fs.create("/b.txt", 0o644).unwrap();
        assert_eq!(created.ino, recreated.ino);
    }

    #[test]
    fn rmdir_rejects_non_empty_directory() {
        let mut fs = fresh_fs();
        fs.mkdir("/d", 0o755).unwrap();
        fs.create("/d/x", 0o644).unwrap();
        let err = fs.rmdir("/d").unwrap_err();
        assert!(matches!(err, crate::error::FsError::DirectoryNotEmpty));
    }

    #[test]
    fn rmdir_removes_empty_directory() {
        let mut fs = fresh_fs();
        fs.mkdir("/d", 0o755).unwrap();
        fs.rmdir("/d").unwrap();
        assert!(fs.getattr("/d").is_err());
    }
}
