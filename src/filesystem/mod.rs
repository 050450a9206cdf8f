use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};

use crate::structs::*;
use crate::Error;

mod dir;
mod ops;
mod path;

pub use ops::{CheckReport, ListEntry, Summary};
pub(crate) use ops::blocks_for_size;

pub const ROOT_INODE: u32 = 0;

pub(crate) fn timestamp_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// The whole filesystem state: a flat 1 MiB image plus the shell's
/// notion of the current directory.
#[derive(Debug)]
pub struct Filesystem {
    pub(crate) image: Vec<u8>,
    pub(crate) current_inode: u32,
    pub(crate) current_path: String,
}

impl Filesystem {
    /// Build a fresh image: superblock, threaded free lists and the
    /// root directory with its `.` and `..` entries.
    pub fn new() -> Result<Self, Error> {
        let mut fs = Self {
            image: vec![0u8; IMAGE_SIZE],
            current_inode: ROOT_INODE,
            current_path: "/".to_owned(),
        };
        Superblock::new().write(&mut fs.image);
        for block in FIRST_DATA_BLOCK..TOTAL_BLOCKS - 1 {
            fs.write_addr(block, 0, block + 1)?;
        }
        for index in 1..MAX_INODES - 1 {
            let mut inode = Inode::zeroed();
            inode.indirect = index + 1;
            inode.write(&mut fs.image, index);
        }

        let now = timestamp_now();
        let mut root = Inode::zeroed();
        root.kind = KIND_DIRECTORY;
        root.ctime = now;
        root.mtime = now;
        root.blocks[0] = fs.allocate_block()?;
        root.write(&mut fs.image, ROOT_INODE);
        fs.add_entry(ROOT_INODE, ".", ROOT_INODE)?;
        fs.add_entry(ROOT_INODE, "..", ROOT_INODE)?;
        debug!("initialised fresh image");
        Ok(fs)
    }

    /// Replace the image with the reader's contents. Only the magic
    /// is validated; the caller decides what a mismatch means.
    pub fn load_from<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut image = vec![0u8; IMAGE_SIZE];
        reader.read_exact(&mut image)?;
        let superblock = Superblock::read(&image);
        if superblock.magic != MAGIC_SIGNATURE {
            warn!(
                "bad magic 0x{:08x}, expected 0x{MAGIC_SIGNATURE:08x}",
                superblock.magic
            );
            return Err(Error::Corruption);
        }
        Ok(Self {
            image,
            current_inode: ROOT_INODE,
            current_path: "/".to_owned(),
        })
    }

    /// Write the whole image out. No partial flushes, no journaling.
    pub fn store_to<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_all(&self.image)?;
        Ok(())
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub(crate) fn superblock(&self) -> Superblock {
        Superblock::read(&self.image)
    }

    pub(crate) fn set_superblock(&mut self, superblock: &Superblock) {
        superblock.write(&mut self.image);
    }

    pub(crate) fn read_inode(&self, index: u32) -> Inode {
        Inode::read(&self.image, index)
    }

    pub(crate) fn write_inode(&mut self, index: u32, inode: &Inode) {
        inode.write(&mut self.image, index);
    }

    pub(crate) fn block(&self, block: u32) -> Result<&[u8], Error> {
        if block >= TOTAL_BLOCKS {
            return Err(Error::Corruption);
        }
        let offset = (block * BLOCK_SIZE) as usize;
        Ok(&self.image[offset..offset + BLOCK_SIZE as usize])
    }

    pub(crate) fn block_mut(&mut self, block: u32) -> Result<&mut [u8], Error> {
        if block >= TOTAL_BLOCKS {
            return Err(Error::Corruption);
        }
        let offset = (block * BLOCK_SIZE) as usize;
        Ok(&mut self.image[offset..offset + BLOCK_SIZE as usize])
    }

    /// Block address stored in the given 4-byte slot of a block.
    /// Slot 0 doubles as the free-list link of a free block.
    pub(crate) fn read_addr(&self, block: u32, slot: usize) -> Result<u32, Error> {
        if slot >= POINTERS_PER_BLOCK {
            return Err(Error::Corruption);
        }
        let data = self.block(block)?;
        Ok(bytemuck::pod_read_unaligned(
            &data[slot * ADDR_SIZE..(slot + 1) * ADDR_SIZE],
        ))
    }

    pub(crate) fn write_addr(&mut self, block: u32, slot: usize, value: u32) -> Result<(), Error> {
        if slot >= POINTERS_PER_BLOCK {
            return Err(Error::Corruption);
        }
        let data = self.block_mut(block)?;
        data[slot * ADDR_SIZE..(slot + 1) * ADDR_SIZE].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Pop the free-block list head. The returned block is zeroed.
    pub(crate) fn allocate_block(&mut self) -> Result<u32, Error> {
        let mut superblock = self.superblock();
        if superblock.free_blocks == 0 || superblock.free_block_head == 0 {
            return Err(Error::NoSpace);
        }
        let block = superblock.free_block_head;
        if !(FIRST_DATA_BLOCK..TOTAL_BLOCKS).contains(&block) {
            warn!("free-block list head {block} is out of range");
            return Err(Error::Corruption);
        }
        superblock.free_block_head = self.read_addr(block, 0)?;
        superblock.free_blocks -= 1;
        self.set_superblock(&superblock);
        self.block_mut(block)?.fill(0);
        Ok(block)
    }

    /// Push a block back on the free list. Addresses outside the data
    /// area are ignored; rollback paths pass zeroes through here.
    pub(crate) fn deallocate_block(&mut self, block: u32) {
        if !(FIRST_DATA_BLOCK..TOTAL_BLOCKS).contains(&block) {
            return;
        }
        let mut superblock = self.superblock();
        if self.write_addr(block, 0, superblock.free_block_head).is_err() {
            return;
        }
        superblock.free_block_head = block;
        superblock.free_blocks += 1;
        self.set_superblock(&superblock);
    }

    /// Pop the free-inode list head and hand back a re-initialised
    /// file inode with both timestamps set to now.
    pub(crate) fn allocate_inode(&mut self) -> Result<u32, Error> {
        let mut superblock = self.superblock();
        if superblock.free_inodes == 0 || superblock.free_inode_head == 0 {
            return Err(Error::NoInodes);
        }
        let index = superblock.free_inode_head;
        superblock.free_inode_head = self.read_inode(index).indirect;
        superblock.free_inodes -= 1;
        self.set_superblock(&superblock);

        let now = timestamp_now();
        let mut inode = Inode::zeroed();
        inode.ctime = now;
        inode.mtime = now;
        self.write_inode(index, &inode);
        Ok(index)
    }

    pub(crate) fn deallocate_inode(&mut self, index: u32) {
        if index >= MAX_INODES {
            return;
        }
        let mut superblock = self.superblock();
        let mut inode = self.read_inode(index);
        inode.indirect = superblock.free_inode_head;
        self.write_inode(index, &inode);
        superblock.free_inode_head = index;
        superblock.free_inodes += 1;
        self.set_superblock(&superblock);
    }
}
