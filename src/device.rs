//! Block device: five primitives over a fixed-size backing file.
//!
//! Each block is [`BLOCK_SIZE`] bytes. Reads and writes are positional
//! (`read_exact_at`/`write_all_at`) so no shared seek cursor needs to be
//! threaded through the single-threaded core.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use log::{debug, trace};

use crate::error::Result;
use crate::param::BLOCK_SIZE;

/// A single logical block, zero-initialized by default.
pub type Block = [u8; BLOCK_SIZE];

pub fn zero_block() -> Block {
    [0u8; BLOCK_SIZE]
}

/// Thin wrapper around a host file acting as the backing store.
pub struct BlockDevice {
    file: File,
}

impl BlockDevice {
    /// Create (or truncate) the backing file and size it for `total_blocks` blocks.
    pub fn init(path: &Path, total_blocks: u64) -> Result<Self> {
        debug!("dev_init: {} ({} blocks)", path.display(), total_blocks);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(total_blocks * BLOCK_SIZE as u64)?;
        Ok(Self { file })
    }

    /// Open an existing backing file. Returns `None` if it does not exist
    /// (the caller then falls back to [`BlockDevice::init`] plus `mkfs`).
    pub fn open(path: &Path) -> Option<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path).ok()?;
        debug!("dev_open: {}", path.display());
        Some(Self { file })
    }

    /// Flush and close. A no-op beyond dropping the handle, since every
    /// write is already write-through (see `block_write`).
    pub fn close(self) {
        debug!("dev_close");
        drop(self.file);
    }

    /// Read exactly `BLOCK_SIZE` bytes from block `index`.
    pub fn read(&self, index: u32, buf: &mut Block) -> Result<()> {
        trace!("block_read({index})");
        self.file.read_exact_at(buf, Self::offset(index))?;
        Ok(())
    }

    /// Write exactly `BLOCK_SIZE` bytes to block `index`.
    pub fn write(&self, index: u32, buf: &Block) -> Result<()> {
        trace!("block_write({index})");
        self.file.write_all_at(buf, Self::offset(index))?;
        Ok(())
    }

    fn offset(index: u32) -> u64 {
        index as u64 * BLOCK_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let dev = BlockDevice::init(&path, 8).unwrap();

        let mut buf = zero_block();
        buf[0] = 0xAB;
        buf[BLOCK_SIZE - 1] = 0xCD;
        dev.write(3, &buf).unwrap();

        let mut out = zero_block();
        dev.read(3, &mut out).unwrap();
        assert_eq!(buf, out);
    }

    #[test]
    fn reopen_preserves_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        {
            let dev = BlockDevice::init(&path, 4).unwrap();
            let mut buf = zero_block();
            buf[10] = 42;
            dev.write(1, &buf).unwrap();
            dev.close();
        }
        let dev = BlockDevice::open(&path).unwrap();
        let mut out = zero_block();
        dev.read(1, &mut out).unwrap();
        assert_eq!(out[10], 42);
    }

    #[test]
    fn open_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.img");
        assert!(BlockDevice::open(&path).is_none());
    }
}
