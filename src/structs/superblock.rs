use std::fmt::Display;
use std::mem::size_of;

use super::*;

impl Superblock {
    /// Values for a freshly initialised image: everything past the
    /// inode table is free, inode 0 stays reserved for the root.
    pub fn new() -> Self {
        Self {
            magic: MAGIC_SIGNATURE,
            block_size: BLOCK_SIZE,
            total_blocks: TOTAL_BLOCKS,
            free_blocks: TOTAL_BLOCKS - FIRST_DATA_BLOCK,
            max_inodes: MAX_INODES,
            free_inodes: MAX_INODES - 1,
            free_block_head: FIRST_DATA_BLOCK,
            free_inode_head: 1,
        }
    }

    pub(crate) fn read(image: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&image[..size_of::<Self>()])
    }

    pub(crate) fn write(&self, image: &mut [u8]) {
        image[..size_of::<Self>()].copy_from_slice(bytemuck::bytes_of(self));
    }
}

impl Default for Superblock {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Superblock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Block size: {} bytes", self.block_size)?;
        writeln!(f, "Total blocks: {}", self.total_blocks)?;
        writeln!(f, "Free blocks: {}", self.free_blocks)?;
        writeln!(f, "First free block: {}", self.free_block_head)?;
        writeln!(f, "Total inodes: {}", self.max_inodes)?;
        writeln!(f, "Free inodes: {}", self.free_inodes)?;
        write!(f, "First free inode: {}", self.free_inode_head)?;
        Ok(())
    }
}
