use super::*;
use crate::Error;

impl DirEntry {
    /// The caller has already validated the name length against
    /// [`MAX_NAME_LEN`].
    pub(crate) fn new(name: &str, inode: u32) -> Self {
        let bytes = name.as_bytes();
        let mut padded = [0u8; MAX_NAME_LEN];
        padded[..bytes.len()].copy_from_slice(bytes);
        Self {
            name: padded,
            inode,
        }
    }

    /// Name bytes up to the first NUL.
    pub(crate) fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_NAME_LEN);
        &self.name[..len]
    }

    pub(crate) fn name(&self) -> Result<&str, Error> {
        Ok(std::str::from_utf8(self.name_bytes())?)
    }

    pub(crate) fn name_matches(&self, name: &str) -> bool {
        self.name_bytes() == name.as_bytes()
    }

    pub(crate) fn is_free(&self) -> bool {
        self.inode == 0
    }
}
