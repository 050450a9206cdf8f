use std::cmp::min;

use log::debug;

use super::{Filesystem, ROOT_INODE};
use crate::structs::*;
use crate::Error;

/// One row of a directory listing, ready for the shell to format.
#[derive(Debug, Clone)]
pub struct ListEntry {
    pub name: String,
    pub directory: bool,
    pub size: u32,
    pub mtime: u32,
}

/// Usage totals taken straight from the superblock.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub block_size: u32,
    pub total_blocks: u32,
    pub used_blocks: u32,
    pub free_blocks: u32,
    pub total_inodes: u32,
    pub used_inodes: u32,
    pub free_inodes: u32,
}

/// Superblock snapshot plus the walked lengths of both free lists.
#[derive(Debug, Clone, Copy)]
pub struct CheckReport {
    pub superblock: Superblock,
    pub free_block_list_len: u32,
    pub free_inode_list_len: u32,
}

pub(crate) fn blocks_for_size(size: u32) -> u32 {
    // u64 arithmetic: sizes near u32::MAX must not wrap
    ((size as u64 + BLOCK_SIZE as u64 - 1) / BLOCK_SIZE as u64) as u32
}

impl Filesystem {
    /// Return every data block the inode references to the free
    /// lists: direct blocks, indirect children, then the indirect
    /// block itself. Tolerates partially populated inodes.
    fn release_payload(&mut self, inode: &Inode) {
        for &block in &inode.blocks {
            if block != 0 {
                self.deallocate_block(block);
            }
        }
        if inode.indirect != 0 {
            for slot in 0..POINTERS_PER_BLOCK {
                if let Ok(address) = self.read_addr(inode.indirect, slot) {
                    if address != 0 {
                        self.deallocate_block(address);
                    }
                }
            }
            self.deallocate_block(inode.indirect);
        }
    }

    fn abort_create(&mut self, index: u32, inode: &Inode) {
        debug!("rolling back allocations for inode {index}");
        self.release_payload(inode);
        self.deallocate_inode(index);
    }

    fn copy_block(&mut self, from: u32, to: u32) -> Result<(), Error> {
        let data = self.block(from)?.to_vec();
        self.block_mut(to)?.copy_from_slice(&data);
        Ok(())
    }

    /// Create a file of `size` bytes with all of its blocks allocated
    /// up front. Content starts out as zeros.
    pub fn create_file(&mut self, path: &str, size: u32) -> Result<(), Error> {
        let (parent, name) = self.split_parent(path)?;
        if self.find_entry(parent, name).is_ok() {
            return Err(Error::AlreadyExists);
        }
        let blocks_needed = blocks_for_size(size);
        if blocks_needed > MAX_FILE_BLOCKS {
            return Err(Error::FileTooLarge);
        }
        let indirect_needed = u32::from(blocks_needed > DIRECT_BLOCKS as u32);
        if self.superblock().free_blocks < blocks_needed + indirect_needed {
            return Err(Error::NoSpace);
        }
        debug!("create file {path} with {blocks_needed} blocks");

        let index = self.allocate_inode()?;
        let mut inode = self.read_inode(index);
        inode.kind = KIND_FILE;
        inode.size = size;

        let direct = min(blocks_needed, DIRECT_BLOCKS as u32) as usize;
        for slot in 0..direct {
            match self.allocate_block() {
                Ok(block) => inode.blocks[slot] = block,
                Err(e) => {
                    self.abort_create(index, &inode);
                    return Err(e);
                }
            }
        }
        if blocks_needed > DIRECT_BLOCKS as u32 {
            match self.allocate_block() {
                Ok(block) => inode.indirect = block,
                Err(e) => {
                    self.abort_create(index, &inode);
                    return Err(e);
                }
            }
            for slot in 0..(blocks_needed as usize - DIRECT_BLOCKS) {
                let block = match self.allocate_block() {
                    Ok(block) => block,
                    Err(e) => {
                        self.abort_create(index, &inode);
                        return Err(e);
                    }
                };
                if let Err(e) = self.write_addr(inode.indirect, slot, block) {
                    self.deallocate_block(block);
                    self.abort_create(index, &inode);
                    return Err(e);
                }
            }
        }

        self.write_inode(index, &inode);
        if let Err(e) = self.add_entry(parent, name, index) {
            self.abort_create(index, &inode);
            return Err(e);
        }
        Ok(())
    }

    pub fn remove_file(&mut self, path: &str) -> Result<(), Error> {
        let (parent, name) = self.split_parent(path)?;
        let index = self.find_entry(parent, name)?;
        let inode = self.read_inode(index);
        if !inode.is_file() {
            return Err(Error::NotAFile);
        }
        debug!("remove file {path} with inode {index}");
        self.remove_entry(parent, name)?;
        self.release_payload(&inode);
        self.deallocate_inode(index);
        Ok(())
    }

    pub fn create_dir(&mut self, path: &str) -> Result<(), Error> {
        let (parent, name) = self.split_parent(path)?;
        if self.find_entry(parent, name).is_ok() {
            return Err(Error::AlreadyExists);
        }
        if self.superblock().free_blocks < 1 {
            return Err(Error::NoSpace);
        }
        debug!("create directory {path}");

        let index = self.allocate_inode()?;
        let mut inode = self.read_inode(index);
        inode.kind = KIND_DIRECTORY;
        let block = match self.allocate_block() {
            Ok(block) => block,
            Err(e) => {
                self.deallocate_inode(index);
                return Err(e);
            }
        };
        inode.blocks[0] = block;
        self.write_inode(index, &inode);

        let seeded = self
            .add_entry(index, ".", index)
            .and_then(|_| self.add_entry(index, "..", parent))
            .and_then(|_| self.add_entry(parent, name, index));
        if let Err(e) = seeded {
            self.deallocate_block(block);
            self.deallocate_inode(index);
            return Err(e);
        }
        Ok(())
    }

    pub fn remove_dir(&mut self, path: &str) -> Result<(), Error> {
        let (parent, name) = self.split_parent(path)?;
        let index = self.find_entry(parent, name)?;
        let inode = self.read_inode(index);
        if !inode.is_directory() {
            return Err(Error::NotADirectory);
        }
        if index == ROOT_INODE {
            return Err(Error::NotEmpty);
        }
        // Only `.` and `..` may remain
        if self.read_entries(index)?.len() > 2 {
            return Err(Error::NotEmpty);
        }
        debug!("remove directory {path} with inode {index}");
        self.remove_entry(parent, name)?;
        self.release_payload(&inode);
        self.deallocate_inode(index);
        Ok(())
    }

    pub fn change_dir(&mut self, path: &str) -> Result<(), Error> {
        if path.is_empty() {
            return Ok(());
        }
        let index = self.resolve(path)?;
        if !self.read_inode(index).is_directory() {
            return Err(Error::NotADirectory);
        }
        self.current_inode = index;
        let combined = if path.starts_with('/') {
            path.to_owned()
        } else if self.current_path == "/" {
            format!("/{path}")
        } else {
            format!("{}/{path}", self.current_path)
        };
        self.current_path = super::path::normalize(&combined);
        Ok(())
    }

    /// Live entries of a directory, sorted by name. An empty path
    /// lists the current directory.
    pub fn list(&self, path: &str) -> Result<Vec<ListEntry>, Error> {
        let index = if path.is_empty() {
            self.current_inode
        } else {
            self.resolve(path)?
        };
        if !self.read_inode(index).is_directory() {
            return Err(Error::NotADirectory);
        }
        let mut rows = Vec::new();
        for entry in self.read_entries(index)? {
            let inode = self.read_inode(entry.inode);
            rows.push(ListEntry {
                name: entry.name()?.to_owned(),
                directory: inode.is_directory(),
                size: inode.size,
                mtime: inode.mtime,
            });
        }
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    /// Clone `src` into a fresh file at `dst`, block by block. Bytes
    /// past `size` in the last block are copied verbatim.
    pub fn copy_file(&mut self, src: &str, dst: &str) -> Result<(), Error> {
        let src_index = self.resolve(src)?;
        let src_inode = self.read_inode(src_index);
        if !src_inode.is_file() {
            return Err(Error::NotAFile);
        }
        let (parent, name) = self.split_parent(dst)?;
        if self.find_entry(parent, name).is_ok() {
            return Err(Error::AlreadyExists);
        }
        let blocks_needed = blocks_for_size(src_inode.size);
        let indirect_needed = u32::from(blocks_needed > DIRECT_BLOCKS as u32);
        if self.superblock().free_blocks < blocks_needed + indirect_needed {
            return Err(Error::NoSpace);
        }
        debug!("copy file {src} -> {dst} ({blocks_needed} blocks)");

        let index = self.allocate_inode()?;
        let mut inode = self.read_inode(index);
        inode.kind = KIND_FILE;
        inode.size = src_inode.size;

        let direct = min(blocks_needed, DIRECT_BLOCKS as u32) as usize;
        for slot in 0..direct {
            let block = match self.allocate_block() {
                Ok(block) => block,
                Err(e) => {
                    self.abort_create(index, &inode);
                    return Err(e);
                }
            };
            inode.blocks[slot] = block;
            if src_inode.blocks[slot] != 0 {
                if let Err(e) = self.copy_block(src_inode.blocks[slot], block) {
                    self.abort_create(index, &inode);
                    return Err(e);
                }
            }
        }
        if blocks_needed > DIRECT_BLOCKS as u32 {
            match self.allocate_block() {
                Ok(block) => inode.indirect = block,
                Err(e) => {
                    self.abort_create(index, &inode);
                    return Err(e);
                }
            }
            if src_inode.indirect != 0 {
                for slot in 0..(blocks_needed as usize - DIRECT_BLOCKS) {
                    let src_child = match self.read_addr(src_inode.indirect, slot) {
                        Ok(address) => address,
                        Err(e) => {
                            self.abort_create(index, &inode);
                            return Err(e);
                        }
                    };
                    if src_child == 0 {
                        continue;
                    }
                    let block = match self.allocate_block() {
                        Ok(block) => block,
                        Err(e) => {
                            self.abort_create(index, &inode);
                            return Err(e);
                        }
                    };
                    let copied = self
                        .write_addr(inode.indirect, slot, block)
                        .and_then(|_| self.copy_block(src_child, block));
                    if let Err(e) = copied {
                        self.deallocate_block(block);
                        self.abort_create(index, &inode);
                        return Err(e);
                    }
                }
            }
        }

        self.write_inode(index, &inode);
        if let Err(e) = self.add_entry(parent, name, index) {
            self.abort_create(index, &inode);
            return Err(e);
        }
        Ok(())
    }

    pub fn summary(&self) -> Summary {
        let sb = self.superblock();
        Summary {
            block_size: sb.block_size,
            total_blocks: sb.total_blocks,
            used_blocks: sb.total_blocks - sb.free_blocks,
            free_blocks: sb.free_blocks,
            total_inodes: sb.max_inodes,
            used_inodes: sb.max_inodes - sb.free_inodes,
            free_inodes: sb.free_inodes,
        }
    }

    /// Dump exactly `size` bytes of a file, direct blocks first, then
    /// indirect children in slot order. A zero address reads as a
    /// window of zeros.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, Error> {
        let index = self.resolve(path)?;
        let inode = self.read_inode(index);
        if !inode.is_file() {
            return Err(Error::NotAFile);
        }
        let mut content = Vec::with_capacity(inode.size as usize);
        let mut remaining = inode.size as usize;
        for &block in &inode.blocks {
            if remaining == 0 {
                break;
            }
            let take = min(remaining, BLOCK_SIZE as usize);
            if block == 0 {
                content.resize(content.len() + take, 0);
            } else {
                content.extend_from_slice(&self.block(block)?[..take]);
            }
            remaining -= take;
        }
        if inode.indirect != 0 {
            for slot in 0..POINTERS_PER_BLOCK {
                if remaining == 0 {
                    break;
                }
                let block = self.read_addr(inode.indirect, slot)?;
                let take = min(remaining, BLOCK_SIZE as usize);
                if block == 0 {
                    content.resize(content.len() + take, 0);
                } else {
                    content.extend_from_slice(&self.block(block)?[..take]);
                }
                remaining -= take;
            }
        }
        content.resize(inode.size as usize, 0);
        Ok(content)
    }

    /// Walk both free lists. Each walk is bounded by the matching
    /// total count; going past it means a cycle.
    pub fn check(&self) -> Result<CheckReport, Error> {
        let superblock = self.superblock();

        let mut block_count = 0u32;
        let mut block = superblock.free_block_head;
        while block != 0 {
            if !(FIRST_DATA_BLOCK..TOTAL_BLOCKS).contains(&block) {
                return Err(Error::Corruption);
            }
            block_count += 1;
            if block_count > superblock.total_blocks {
                return Err(Error::Corruption);
            }
            block = self.read_addr(block, 0)?;
        }

        let mut inode_count = 0u32;
        let mut index = superblock.free_inode_head;
        while index != 0 {
            if index >= MAX_INODES {
                return Err(Error::Corruption);
            }
            inode_count += 1;
            if inode_count > superblock.max_inodes {
                return Err(Error::Corruption);
            }
            index = self.read_inode(index).indirect;
        }

        Ok(CheckReport {
            superblock,
            free_block_list_len: block_count,
            free_inode_list_len: inode_count,
        })
    }
}
