//! Allocator and inode I/O: scanning the two bitmaps, and translating an
//! inode number to a (block, offset) read-modify-write.

use log::{trace, warn};

use crate::bitmap::{clear_bit, find_first_clear, get_bit, set_bit};
use crate::device::zero_block;
use crate::error::{FsError, Result};
use crate::param::BLOCK_SIZE;

use super::inode::{Dinode, DINODE_SIZE};
use super::Filesystem;

impl Filesystem {
    fn inodes_per_block() -> usize {
        BLOCK_SIZE / DINODE_SIZE
    }

    /// Scan the inode bitmap for the lowest clear bit, set it, persist the
    /// bitmap block, and return the index.
    pub fn alloc_inode(&mut self) -> Result<u32> {
        let max = self.superblock.max_inum as usize;
        let ino = find_first_clear(&self.inode_bitmap, max).ok_or_else(|| {
            warn!("alloc_inode: inode bitmap exhausted");
            FsError::NoSpace
        })?;
        set_bit(&mut self.inode_bitmap, ino);
        self.write_inode_bitmap()?;
        trace!("alloc_inode -> {ino}");
        Ok(ino as u32)
    }

    /// Clear the bit and persist the bitmap.
    pub fn free_inode(&mut self, ino: u32) -> Result<()> {
        trace!("free_inode({ino})");
        clear_bit(&mut self.inode_bitmap, ino as usize);
        self.write_inode_bitmap()
    }

    /// Scan the data-region bitmap for the lowest clear bit, set it,
    /// persist the bitmap block, and return the index. Does not zero the
    /// block; callers initialize what they need (§4.3).
    pub fn alloc_data_block(&mut self) -> Result<u32> {
        let max = self.superblock.max_dnum as usize;
        let b = find_first_clear(&self.data_bitmap, max).ok_or_else(|| {
            warn!("alloc_data_block: data bitmap exhausted");
            FsError::NoSpace
        })?;
        set_bit(&mut self.data_bitmap, b);
        self.write_data_bitmap()?;
        trace!("alloc_data_block -> {b}");
        Ok(b as u32)
    }

    /// Clear the bit and persist the bitmap.
    pub fn free_data_block(&mut self, b: u32) -> Result<()> {
        trace!("free_data_block({b})");
        clear_bit(&mut self.data_bitmap, b as usize);
        self.write_data_bitmap()
    }

    fn write_inode_bitmap(&self) -> Result<()> {
        self.device
            .write(self.superblock.i_bitmap_blk, &self.inode_bitmap)
    }

    fn write_data_bitmap(&self) -> Result<()> {
        self.device
            .write(self.superblock.d_bitmap_blk, &self.data_bitmap)
    }

    /// Translate `ino` to (block, offset) and copy out its record.
    ///
    /// An out-of-range `ino` is a programming fault, not a runtime error:
    /// the surface never constructs one (§4.4).
    pub fn read_inode(&self, ino: u32) -> Result<Dinode> {
        debug_assert!((ino as usize) < self.superblock.max_inum as usize);
        let ipb = Self::inodes_per_block();
        let block_idx = self.superblock.i_start_blk + ino / ipb as u32;
        let offset = (ino as usize % ipb) * DINODE_SIZE;

        let mut block = zero_block();
        self.device.read(block_idx, &mut block)?;
        Ok(Dinode::decode(&block[offset..offset + DINODE_SIZE]))
    }

    /// Read-modify-write: the target block holds `ipb` sibling records, so
    /// a blind overwrite would destroy them (§4.4).
    pub fn write_inode(&self, inode: &Dinode) -> Result<()> {
        debug_assert!((inode.ino as usize) < self.superblock.max_inum as usize);
        let ipb = Self::inodes_per_block();
        let block_idx = self.superblock.i_start_blk + inode.ino / ipb as u32;
        let offset = (inode.ino as usize % ipb) * DINODE_SIZE;

        let mut block = zero_block();
        self.device.read(block_idx, &mut block)?;
        block[offset..offset + DINODE_SIZE].copy_from_slice(&inode.encode());
        self.device.write(block_idx, &block)
    }
}

#[cfg(test)]
mod tests {
    use crate::fs::inode::InodeType;
    use crate::fs::test_support::fresh_fs;

    #[test]
    fn alloc_inode_picks_lowest_clear_bit() {
        let mut fs = fresh_fs();
        // ino 0 is the root, already allocated by mkfs.
        let a = fs.alloc_inode().unwrap();
        let b = fs.alloc_inode().unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn free_inode_allows_reuse() {
        let mut fs = fresh_fs();
        let a = fs.alloc_inode().unwrap();
        fs.free_inode(a).unwrap();
        let b = fs.alloc_inode().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn read_write_inode_round_trips() {
        let mut fs = fresh_fs();
        let ino = fs.alloc_inode().unwrap();
        let mut inode = crate::fs::inode::Dinode::new(ino, InodeType::File, 0o644);
        inode.size = 42;
        fs.write_inode(&inode).unwrap();
        let back = fs.read_inode(ino).unwrap();
        assert_eq!(back.size, 42);
        assert_eq!(back.ino, ino);
    }

    #[test]
    fn write_inode_does_not_clobber_siblings() {
        let mut fs = fresh_fs();
        let a = fs.alloc_inode().unwrap();
        let b = fs.alloc_inode().unwrap();
        let mut ia = crate::fs::inode::Dinode::new(a, InodeType::File, 0o644);
        ia.size = 11;
        let mut ib = crate::fs::inode::Dinode::new(b, InodeType::File, 0o644);
        ib.size = 22;
        fs.write_inode(&ia).unwrap();
        fs.write_inode(&ib).unwrap();
        assert_eq!(fs.read_inode(a).unwrap().size, 11);
        assert_eq!(fs.read_inode(b).unwrap().size, 22);
    }
}
