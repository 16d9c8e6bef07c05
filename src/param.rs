//! Fixed layout constants shared by every module.

/// Size of one block, in bytes. Must be a power of two.
pub const BLOCK_SIZE: usize = 4096;

/// Total number of inodes the image can hold.
pub const MAX_INUM: usize = 1024;

/// Total number of data blocks in the data region.
pub const MAX_DNUM: usize = 16384;

/// Longest file name, not counting the trailing NUL.
pub const NAME_MAX: usize = 207;

/// Size, in bytes, of a directory-entry `name` field (`NAME_MAX` + 1 for the NUL).
pub const NAME_FIELD: usize = NAME_MAX + 1;

/// Number of direct block pointers an inode carries.
pub const NDIRECT: usize = 16;

/// Magic number identifying a tinyfs image.
pub const MAGIC: u32 = 0x5A41_5446;

/// Block index of the superblock.
pub const SUPERBLOCK_BLK: u32 = 0;

/// Block index of the inode bitmap.
pub const IBITMAP_BLK: u32 = 1;

/// Block index of the data-region bitmap.
pub const DBITMAP_BLK: u32 = 2;

/// Block index of the first inode-table block.
pub const ISTART_BLK: u32 = 3;

/// Root inode number. Created by `mkfs`, never freed.
pub const ROOTINO: u32 = 0;

/// Default location of the backing file, relative to the process's cwd at launch.
pub const DEFAULT_IMAGE: &str = "./DISKFILE";
