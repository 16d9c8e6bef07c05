//! On-disk superblock: the single metadata block at index 0 recording the
//! rest of the image's layout.

use static_assertions::const_assert;
use zerocopy::{AsBytes, FromBytes};

use crate::device::Block;
use crate::error::{FsError, Result};
use crate::param::{
    BLOCK_SIZE, DBITMAP_BLK, IBITMAP_BLK, ISTART_BLK, MAGIC, MAX_DNUM, MAX_INUM, SUPERBLOCK_BLK,
};

use super::inode::DINODE_SIZE;

/// On-disk layout:
/// `[ superblock | inode bitmap | data bitmap | inode table | data region ]`
#[repr(C)]
#[derive(Debug, Clone, Copy, AsBytes, FromBytes)]
pub struct Superblock {
    pub magic: u32,
    pub max_inum: u32,
    pub max_dnum: u32,
    pub i_bitmap_blk: u32,
    pub d_bitmap_blk: u32,
    pub i_start_blk: u32,
    pub d_start_blk: u32,
}

const_assert!(core::mem::size_of::<Superblock>() <= BLOCK_SIZE);

impl Superblock {
    /// Compute the layout for a fresh image. `d_start_blk` follows the
    /// inode table, sized to hold `MAX_INUM` fixed-width inode records.
    pub fn new() -> Self {
        let inode_table_bytes = MAX_INUM * DINODE_SIZE;
        let inode_table_blocks = (inode_table_bytes + BLOCK_SIZE - 1) / BLOCK_SIZE;
        Self {
            magic: MAGIC,
            max_inum: MAX_INUM as u32,
            max_dnum: MAX_DNUM as u32,
            i_bitmap_blk: IBITMAP_BLK,
            d_bitmap_blk: DBITMAP_BLK,
            i_start_blk: ISTART_BLK,
            d_start_blk: ISTART_BLK + inode_table_blocks as u32,
        }
    }

    pub fn encode(&self) -> Block {
        let mut block = crate::device::zero_block();
        block[..core::mem::size_of::<Self>()].copy_from_slice(self.as_bytes());
        block
    }

    pub fn decode(block: &Block) -> Result<Self> {
        let sb = Self::read_from_prefix(&block[..]).expect("superblock decode: size mismatch");
        if sb.magic != MAGIC {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "bad tinyfs magic number",
            )));
        }
        Ok(sb)
    }

    /// Total number of blocks the image spans.
    pub fn total_blocks(&self) -> u32 {
        self.d_start_blk + self.max_dnum
    }

    /// Block index of the superblock itself, for symmetry with the other accessors.
    pub const fn self_block() -> u32 {
        SUPERBLOCK_BLK
    }
}

impl Default for Superblock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        let sb = Superblock::new();
        let block = sb.encode();
        let back = Superblock::decode(&block).unwrap();
        assert_eq!(sb.magic, back.magic);
        assert_eq!(sb.d_start_blk, back.d_start_blk);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let block = crate::device::zero_block();
        assert!(Superblock::decode(&block).is_err());
    }

    #[test]
    fn data_region_follows_inode_table() {
        let sb = Superblock::new();
        let inode_table_bytes = MAX_INUM * DINODE_SIZE;
        let expected_blocks = (inode_table_bytes + BLOCK_SIZE - 1) / BLOCK_SIZE;
        assert_eq!(sb.d_start_blk, ISTART_BLK + expected_blocks as u32);
    }
}
