use super::{Filesystem, ROOT_INODE};
use crate::Error;

/// Split on `/`, dropping empty components.
pub(crate) fn parse_components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|component| !component.is_empty())
}

/// Collapse `.` and `..` textually and re-emit as `/a/b/c`.
/// Only used to maintain the prompt path; the namespace itself is
/// always walked through directory entries.
pub(crate) fn normalize(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for component in parse_components(path) {
        match component {
            "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}", stack.join("/"))
    }
}

impl Filesystem {
    /// Walk `path` down to an inode. Absolute paths start at the
    /// root, relative ones at the current directory. The result may
    /// be a file or a directory; callers type-check.
    pub(crate) fn resolve(&self, path: &str) -> Result<u32, Error> {
        if path.is_empty() {
            return Ok(self.current_inode);
        }
        let mut inode = if path.starts_with('/') {
            ROOT_INODE
        } else {
            self.current_inode
        };
        for component in parse_components(path) {
            match component {
                "." => {}
                ".." => {
                    if inode == ROOT_INODE {
                        continue;
                    }
                    inode = self
                        .find_entry(inode, "..")
                        .map_err(|_| Error::PathNotFound)?;
                }
                name => {
                    inode = self
                        .find_entry(inode, name)
                        .map_err(|_| Error::PathNotFound)?;
                }
            }
        }
        Ok(inode)
    }

    /// Resolve everything up to the last component and hand the
    /// basename back untouched.
    pub(crate) fn split_parent<'p>(&self, path: &'p str) -> Result<(u32, &'p str), Error> {
        let (parent, basename) = match path.rfind('/') {
            None => (".", path),
            Some(0) => ("/", &path[1..]),
            Some(index) => (&path[..index], &path[index + 1..]),
        };
        if basename.is_empty() {
            return Err(Error::PathNotFound);
        }
        Ok((self.resolve(parent)?, basename))
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Filesystem, ROOT_INODE};
    use super::{normalize, parse_components};
    use crate::Error;

    #[test]
    fn components() {
        let parts: Vec<&str> = parse_components("/a//b/c/").collect();
        assert_eq!(parts, ["a", "b", "c"]);
        assert_eq!(parse_components("/").count(), 0);
        assert_eq!(parse_components("").count(), 0);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/a/./b"), "/a/b");
        assert_eq!(normalize("/.."), "/");
        assert_eq!(normalize("/a/b/../.."), "/");
        assert_eq!(normalize("a/b"), "/a/b");
        assert_eq!(normalize("/"), "/");
    }

    fn sample_tree() -> Filesystem {
        let mut fs = Filesystem::new().unwrap();
        fs.create_dir("/a").unwrap();
        fs.create_dir("/a/b").unwrap();
        fs.create_file("/a/b/f", 100).unwrap();
        fs
    }

    #[test]
    fn resolve_absolute() {
        let fs = sample_tree();
        assert_eq!(fs.resolve("/").unwrap(), ROOT_INODE);
        let a = fs.resolve("/a").unwrap();
        let b = fs.resolve("/a/b").unwrap();
        assert_ne!(a, b);
        assert_eq!(fs.resolve("/a/b/..").unwrap(), a);
        assert_eq!(fs.resolve("/a/./b").unwrap(), b);
        assert!(matches!(fs.resolve("/missing"), Err(Error::PathNotFound)));
    }

    #[test]
    fn resolve_relative() {
        let mut fs = sample_tree();
        fs.change_dir("/a").unwrap();
        let b = fs.resolve("/a/b").unwrap();
        assert_eq!(fs.resolve("b").unwrap(), b);
        assert_eq!(fs.resolve("..").unwrap(), ROOT_INODE);
        assert_eq!(fs.resolve("").unwrap(), fs.resolve("/a").unwrap());
    }

    #[test]
    fn dot_dot_above_root_stays_at_root() {
        let fs = sample_tree();
        assert_eq!(fs.resolve("/../../..").unwrap(), ROOT_INODE);
    }

    #[test]
    fn file_in_the_middle_fails() {
        let fs = sample_tree();
        assert!(matches!(
            fs.resolve("/a/b/f/deeper"),
            Err(Error::PathNotFound)
        ));
    }

    #[test]
    fn parent_and_basename() {
        let fs = sample_tree();
        let a = fs.resolve("/a").unwrap();

        let (parent, name) = fs.split_parent("/a/new").unwrap();
        assert_eq!(parent, a);
        assert_eq!(name, "new");

        let (parent, name) = fs.split_parent("/top").unwrap();
        assert_eq!(parent, ROOT_INODE);
        assert_eq!(name, "top");

        let (parent, name) = fs.split_parent("plain").unwrap();
        assert_eq!(parent, ROOT_INODE);
        assert_eq!(name, "plain");

        assert!(matches!(fs.split_parent("/a/"), Err(Error::PathNotFound)));
        assert!(matches!(fs.split_parent(""), Err(Error::PathNotFound)));
    }
}
