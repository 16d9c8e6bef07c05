//! File I/O: mapping a byte range to direct blocks only (§4.7).

use log::trace;

use crate::device::zero_block;
use crate::error::Result;
use crate::param::{BLOCK_SIZE, NDIRECT};

use super::inode::Dinode;
use super::Filesystem;

impl Filesystem {
    /// Read up to `buf.len()` bytes starting at `offset`. A hole or a read
    /// past EOF ends the transfer early and returns the bytes already
    /// copied — not an error (§4.7, §7).
    pub fn file_read(&self, inode: &Dinode, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= inode.size {
            return Ok(0);
        }
        let n = buf.len().min((inode.size - offset) as usize);
        if n == 0 {
            return Ok(0);
        }

        let mut done = 0;
        while done < n {
            let pos = offset + done as u64;
            let block_slot = (pos / BLOCK_SIZE as u64) as usize;
            if block_slot >= NDIRECT {
                break;
            }
            let ptr = inode.direct_ptr[block_slot];
            if ptr == -1 {
                trace!("file_read: hole at block {block_slot}");
                break;
            }
            let within = (pos % BLOCK_SIZE as u64) as usize;
            let take = (BLOCK_SIZE - within).min(n - done);

            let mut block = zero_block();
            self.device
                .read(self.superblock.d_start_blk + ptr as u32, &mut block)?;
            buf[done..done + take].copy_from_slice(&block[within..within + take]);
            done += take;
        }
        Ok(done)
    }

    /// Write `data` starting at `offset`, allocating blocks as needed.
    /// `inode.size` is updated to `max(size, offset + bytes_written)` — not
    /// an unconditional increment, which would double-count on overwrite
    /// (§9, resolved Open Question).
    pub fn file_write(&mut self, inode: &mut Dinode, offset: u64, data: &[u8]) -> Result<usize> {
        let mut done = 0;
        while done < data.len() {
            let pos = offset + done as u64;
            let block_slot = (pos / BLOCK_SIZE as u64) as usize;
            if block_slot >= NDIRECT {
                break;
            }
            let within = (pos % BLOCK_SIZE as u64) as usize;
            let take = (BLOCK_SIZE - within).min(data.len() - done);

            let block_no = if inode.direct_ptr[block_slot] == -1 {
                let allocated = self.alloc_data_block()?;
                inode.direct_ptr[block_slot] = allocated as i32;
                allocated
            } else {
                inode.direct_ptr[block_slot] as u32
            };
            let block_idx = self.superblock.d_start_blk + block_no;

            let mut block = zero_block();
            // Partial-block edges need the existing contents preserved.
            if within != 0 || take != BLOCK_SIZE {
                self.device.read(block_idx, &mut block)?;
            }
            block[within..within + take].copy_from_slice(&data[done..done + take]);
            self.device.write(block_idx, &block)?;

            done += take;
        }

        inode.size = inode.size.max(offset + done as u64);
        inode.vstat.size = inode.size;
        self.write_inode(inode)?;
        Ok(done)
    }
}
