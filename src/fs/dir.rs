//! Directory operations: `dir_lookup`, `dir_add`, `dir_remove`.
//!
//! All three scan a directory's direct pointers in order; for each block
//! present, entries are iterated at stride `DIRENT_SIZE` while the next
//! entry fully fits in the block (§4.5).

use log::trace;

use crate::device::zero_block;
use crate::error::{FsError, Result};
use crate::param::{BLOCK_SIZE, NDIRECT};

use super::inode::{Dinode, Dirent, InodeType, DIRENT_SIZE};
use super::Filesystem;

const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIRENT_SIZE;

impl Filesystem {
    /// Returns the matching entry and its (block-slot, offset-in-block)
    /// location, or `NotFound`.
    fn dir_scan(&self, dir: &Dinode, name: &[u8]) -> Result<Option<(usize, usize, Dirent)>> {
        for (slot, &ptr) in dir.direct_ptr.iter().enumerate() {
            if ptr == -1 {
                break;
            }
            let block_idx = self.superblock.d_start_blk + ptr as u32;
            let mut block = zero_block();
            self.device.read(block_idx, &mut block)?;

            for i in 0..ENTRIES_PER_BLOCK {
                let off = i * DIRENT_SIZE;
                let entry = Dirent::decode(&block[off..off + DIRENT_SIZE]);
                if entry.occupied && entry.name() == name {
                    trace!("dir_scan: found {:?} in slot {slot}", String::from_utf8_lossy(name));
                    return Ok(Some((slot, off, entry)));
                }
            }
        }
        Ok(None)
    }

    /// Look up `name` in `dir`'s entries. Used both for existence checks
    /// and to fetch the matching entry.
    pub fn dir_lookup(&self, dir: &Dinode, name: &[u8]) -> Result<Dirent> {
        self.dir_scan(dir, name)?
            .map(|(_, _, entry)| entry)
            .ok_or(FsError::NotFound)
    }

    /// Add a `(child_ino, name)` entry to `dir`. Rejects empty/duplicate
    /// names and names over `NAME_MAX`.
    pub fn dir_add(&mut self, dir: &mut Dinode, child_ino: u32, name: &[u8]) -> Result<()> {
        if self.dir_scan(dir, name)?.is_some() {
            return Err(FsError::AlreadyExists);
        }
        let new_entry = Dirent::occupied(child_ino, name)?;

        // Step 1: reuse an existing free slot in an already-allocated block.
        for &ptr in dir.direct_ptr.iter() {
            if ptr == -1 {
                break;
            }
            let block_idx = self.superblock.d_start_blk + ptr as u32;
            let mut block = zero_block();
            self.device.read(block_idx, &mut block)?;

            for i in 0..ENTRIES_PER_BLOCK {
                let off = i * DIRENT_SIZE;
                let entry = Dirent::decode(&block[off..off + DIRENT_SIZE]);
                if !entry.occupied {
                    block[off..off + DIRENT_SIZE].copy_from_slice(&new_entry.encode());
                    self.device.write(block_idx, &block)?;
                    dir.size += DIRENT_SIZE as u64;
                    dir.link += 1;
                    self.write_inode(dir)?;
                    return Ok(());
                }
            }
        }

        // Step 2: no free slot anywhere — allocate a new data block.
        let slot = dir
            .first_free_direct_slot()
            .ok_or(FsError::NoSpace)?;
        let block_no = self.alloc_data_block()?;

        let mut block = zero_block();
        let free = Dirent::free().encode();
        for i in 0..ENTRIES_PER_BLOCK {
            let off = i * DIRENT_SIZE;
            block[off..off + DIRENT_SIZE].copy_from_slice(&free);
        }
        block[..DIRENT_SIZE].copy_from_slice(&new_entry.encode());
        self.device
            .write(self.superblock.d_start_blk + block_no, &block)?;

        dir.direct_ptr[slot] = block_no as i32;
        dir.size += DIRENT_SIZE as u64;
        dir.link += 1;
        self.write_inode(dir)
    }

    /// Remove the entry named `name` from `dir`. Frees the child's direct
    /// blocks and inode. The parent's direct-pointer list is not compacted
    /// even if a block becomes entirely free (§4.5, deliberate simplification).
    pub fn dir_remove(&mut self, dir: &mut Dinode, name: &[u8]) -> Result<()> {
        let (slot, off, _) = self.dir_scan(dir, name)?.ok_or(FsError::NotFound)?;
        let ptr = dir.direct_ptr[slot];
        let block_idx = self.superblock.d_start_blk + ptr as u32;

        let mut block = zero_block();
        self.device.read(block_idx, &mut block)?;
        let entry = Dirent::decode(&block[off..off + DIRENT_SIZE]);
        block[off..off + DIRENT_SIZE].copy_from_slice(&Dirent::free().encode());
        self.device.write(block_idx, &block)?;

        let child = self.read_inode(entry.ino)?;
        for &ptr in child.direct_ptr.iter() {
            if ptr == -1 {
                break;
            }
            self.free_data_block(ptr as u32)?;
        }
        self.free_inode(entry.ino)?;
        let mut dead = child;
        dead.valid = false;
        self.write_inode(&dead)?;

        dir.size = dir.size.saturating_sub(DIRENT_SIZE as u64);
        dir.link = dir.link.saturating_sub(1);
        self.write_inode(dir)
    }

    /// `true` if `dir` has no occupied entries at all (used by `rmdir`).
    pub fn dir_is_empty(&self, dir: &Dinode) -> Result<bool> {
        for &ptr in dir.direct_ptr.iter().take(NDIRECT) {
            if ptr == -1 {
                break;
            }
            let block_idx = self.superblock.d_start_blk + ptr as u32;
            let mut block = zero_block();
            self.device.read(block_idx, &mut block)?;
            for i in 0..ENTRIES_PER_BLOCK {
                let off = i * DIRENT_SIZE;
                if Dirent::decode(&block[off..off + DIRENT_SIZE]).occupied {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Iterate every occupied entry in `dir`, calling `f(name, ino, type)`.
    /// The child's type is read from its inode so callers (the FUSE
    /// adapter) can report directories as directories without a second,
    /// separate `getattr` round-trip per entry.
    pub fn dir_iter(
        &self,
        dir: &Dinode,
        mut f: impl FnMut(&[u8], u32, InodeType),
    ) -> Result<()> {
        for &ptr in dir.direct_ptr.iter() {
            if ptr == -1 {
                break;
            }
            let block_idx = self.superblock.d_start_blk + ptr as u32;
            let mut block = zero_block();
            self.device.read(block_idx, &mut block)?;
            for i in 0..ENTRIES_PER_BLOCK {
                let off = i * DIRENT_SIZE;
                let entry = Dirent::decode(&block[off..off + DIRENT_SIZE]);
                if entry.occupied {
                    let child = self.read_inode(entry.ino)?;
                    f(entry.name(), entry.ino, child.typ);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::fs::inode::InodeType;
    use crate::fs::test_support::fresh_fs;

    #[test]
    fn add_then_lookup() {
        let mut fs = fresh_fs();
        let mut root = fs.read_inode(0).unwrap();
        let child_ino = fs.alloc_inode().unwrap();
        let child = crate::fs::inode::Dinode::new(child_ino, InodeType::File, 0o644);
        fs.write_inode(&child).unwrap();

        fs.dir_add(&mut root, child_ino, b"a.txt").unwrap();
        let found = fs.dir_lookup(&root, b"a.txt").unwrap();
        assert_eq!(found.ino, child_ino);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut fs = fresh_fs();
        let mut root = fs.read_inode(0).unwrap();
        let child_ino = fs.alloc_inode().unwrap();
        fs.dir_add(&mut root, child_ino, b"a").unwrap();
        let other_ino = fs.alloc_inode().unwrap();
        let err = fs.dir_add(&mut root, other_ino, b"a").unwrap_err();
        assert!(matches!(err, crate::error::FsError::AlreadyExists));
    }

    #[test]
    fn remove_then_lookup_fails_and_frees_inode() {
        let mut fs = fresh_fs();
        let mut root = fs.read_inode(0).unwrap();
        let child_ino = fs.alloc_inode().unwrap();
        let child = crate::fs::inode::Dinode::new(child_ino, InodeType::File, 0o644);
        fs.write_inode(&child).unwrap();
        fs.dir_add(&mut root, child_ino, b"a").unwrap();

        fs.dir_remove(&mut root, b"a").unwrap();
        assert!(fs.dir_lookup(&root, b"a").is_err());

        // The freed inode number is reused on the next allocation.
        let reused = fs.alloc_inode().unwrap();
        assert_eq!(reused, child_ino);
    }

    #[test]
    fn remove_decrements_size_to_match_live_entries() {
        let mut fs = fresh_fs();
        let mut root = fs.read_inode(0).unwrap();
        let dirent_size = crate::fs::inode::DIRENT_SIZE as u64;
        assert_eq!(root.size, 0);

        let child_ino = fs.alloc_inode().unwrap();
        let child = crate::fs::inode::Dinode::new(child_ino, InodeType::File, 0o644);
        fs.write_inode(&child).unwrap();
        fs.dir_add(&mut root, child_ino, b"a").unwrap();
        assert_eq!(root.size, dirent_size);

        fs.dir_remove(&mut root, b"a").unwrap();
        assert_eq!(root.size, 0);

        let other_ino = fs.alloc_inode().unwrap();
        let other = crate::fs::inode::Dinode::new(other_ino, InodeType::File, 0o644);
        fs.write_inode(&other).unwrap();
        fs.dir_add(&mut root, other_ino, b"b").unwrap();
        assert_eq!(root.size, dirent_size);
    }

    #[test]
    fn add_spills_into_new_data_block() {
        let mut fs = fresh_fs();
        let mut root = fs.read_inode(0).unwrap();
        let entries_per_block = crate::param::BLOCK_SIZE / crate::fs::inode::DIRENT_SIZE;
        for i in 0..entries_per_block + 1 {
            let ino = fs.alloc_inode().unwrap();
            let child = crate::fs::inode::Dinode::new(ino, InodeType::File, 0o644);
            fs.write_inode(&child).unwrap();
            fs.dir_add(&mut root, ino, format!("f{i}").as_bytes())
                .unwrap();
        }
        assert_eq!(root.direct_ptr[0] >= 0, true);
        assert_eq!(root.direct_ptr[1] >= 0, true);
    }
}
