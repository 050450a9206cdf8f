use log::debug;

use super::Filesystem;
use crate::structs::*;
use crate::Error;

impl Filesystem {
    pub(crate) fn dir_slot(&self, block: u32, slot: usize) -> Result<DirEntry, Error> {
        if slot >= ENTRIES_PER_BLOCK {
            return Err(Error::Corruption);
        }
        let data = self.block(block)?;
        Ok(bytemuck::pod_read_unaligned(
            &data[slot * DIR_ENTRY_SIZE..(slot + 1) * DIR_ENTRY_SIZE],
        ))
    }

    pub(crate) fn set_dir_slot(
        &mut self,
        block: u32,
        slot: usize,
        entry: &DirEntry,
    ) -> Result<(), Error> {
        if slot >= ENTRIES_PER_BLOCK {
            return Err(Error::Corruption);
        }
        let data = self.block_mut(block)?;
        data[slot * DIR_ENTRY_SIZE..(slot + 1) * DIR_ENTRY_SIZE]
            .copy_from_slice(bytemuck::bytes_of(entry));
        Ok(())
    }

    /// Every data block a directory owns, direct blocks first, then
    /// the populated slots of its indirect block.
    fn dir_blocks(&self, inode: &Inode) -> Result<Vec<u32>, Error> {
        let mut blocks: Vec<u32> = inode.blocks.iter().copied().filter(|&b| b != 0).collect();
        if inode.indirect != 0 {
            for slot in 0..POINTERS_PER_BLOCK {
                let address = self.read_addr(inode.indirect, slot)?;
                if address != 0 {
                    blocks.push(address);
                }
            }
        }
        Ok(blocks)
    }

    /// All live entries in scan order. Consumers that want a
    /// user-visible order sort by name themselves.
    pub(crate) fn read_entries(&self, dir: u32) -> Result<Vec<DirEntry>, Error> {
        let inode = self.read_inode(dir);
        if !inode.is_directory() {
            return Err(Error::NotADirectory);
        }
        let mut entries = Vec::new();
        for block in self.dir_blocks(&inode)? {
            for slot in 0..ENTRIES_PER_BLOCK {
                let entry = self.dir_slot(block, slot)?;
                if !entry.is_free() {
                    entries.push(entry);
                }
            }
        }
        Ok(entries)
    }

    pub(crate) fn find_entry(&self, dir: u32, name: &str) -> Result<u32, Error> {
        self.read_entries(dir)?
            .iter()
            .find(|e| e.name_matches(name))
            .map(|e| e.inode)
            .ok_or(Error::PathNotFound)
    }

    fn free_slot(&self, block: u32) -> Result<Option<usize>, Error> {
        for slot in 0..ENTRIES_PER_BLOCK {
            if self.dir_slot(block, slot)?.is_free() {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    fn commit_entry(
        &mut self,
        dir: u32,
        mut inode: Inode,
        block: u32,
        slot: usize,
        entry: &DirEntry,
    ) -> Result<(), Error> {
        self.set_dir_slot(block, slot, entry)?;
        inode.size += DIR_ENTRY_SIZE as u32;
        inode.mtime = super::timestamp_now();
        self.write_inode(dir, &inode);
        Ok(())
    }

    /// Place `(name, inode)` in the first free slot, growing the
    /// directory with fresh blocks on demand. A failing call releases
    /// every block it allocated before returning.
    pub(crate) fn add_entry(&mut self, dir: u32, name: &str, target: u32) -> Result<(), Error> {
        if name.len() >= MAX_NAME_LEN {
            return Err(Error::NameTooLong);
        }
        let mut inode = self.read_inode(dir);
        if !inode.is_directory() {
            return Err(Error::NotADirectory);
        }
        debug!("add entry {name} -> inode {target} in directory inode {dir}");
        let entry = DirEntry::new(name, target);

        for index in 0..DIRECT_BLOCKS {
            if inode.blocks[index] == 0 {
                let block = self.allocate_block()?;
                inode.blocks[index] = block;
                self.write_inode(dir, &inode);
            }
            let block = inode.blocks[index];
            if let Some(slot) = self.free_slot(block)? {
                return self.commit_entry(dir, inode, block, slot, &entry);
            }
        }

        let mut fresh_indirect = false;
        if inode.indirect == 0 {
            inode.indirect = self.allocate_block()?;
            self.write_inode(dir, &inode);
            fresh_indirect = true;
        }
        for slot in 0..POINTERS_PER_BLOCK {
            let mut block = self.read_addr(inode.indirect, slot)?;
            if block == 0 {
                block = match self.allocate_block() {
                    Ok(block) => block,
                    Err(e) => {
                        if fresh_indirect {
                            self.deallocate_block(inode.indirect);
                            inode.indirect = 0;
                            self.write_inode(dir, &inode);
                        }
                        return Err(e);
                    }
                };
                self.write_addr(inode.indirect, slot, block)?;
            }
            if let Some(free) = self.free_slot(block)? {
                return self.commit_entry(dir, inode, block, free, &entry);
            }
        }

        if fresh_indirect {
            self.deallocate_block(inode.indirect);
            inode.indirect = 0;
            self.write_inode(dir, &inode);
        }
        Err(Error::NoSpace)
    }

    /// Tombstone the named entry. Emptied blocks stay with the
    /// directory until it is destroyed.
    pub(crate) fn remove_entry(&mut self, dir: u32, name: &str) -> Result<(), Error> {
        let mut inode = self.read_inode(dir);
        if !inode.is_directory() {
            return Err(Error::NotADirectory);
        }
        for block in self.dir_blocks(&inode)? {
            for slot in 0..ENTRIES_PER_BLOCK {
                let mut entry = self.dir_slot(block, slot)?;
                if entry.is_free() || !entry.name_matches(name) {
                    continue;
                }
                debug!("remove entry {name} from directory inode {dir}");
                entry.inode = 0;
                self.set_dir_slot(block, slot, &entry)?;
                inode.size = inode.size.saturating_sub(DIR_ENTRY_SIZE as u32);
                inode.mtime = super::timestamp_now();
                self.write_inode(dir, &inode);
                return Ok(());
            }
        }
        Err(Error::PathNotFound)
    }
}
