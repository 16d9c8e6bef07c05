//! Path resolver: walks a `/`-separated path one component at a time from
//! a starting inode, by default the root (§4.6).

use crate::error::{FsError, Result};
use crate::param::ROOTINO;

use super::inode::{Dinode, InodeType};
use super::Filesystem;

/// Split off the next path component and what remains after it.
///
/// Mirrors the teacher's `Path::skipelem`: leading/repeated slashes are
/// skipped, and the returned remainder has no leading slashes, so the
/// caller can tell "last component" by checking whether it's empty.
fn skip_elem(path: &str) -> Option<(&str, &str)> {
    let bytes = path.as_bytes();
    let start = bytes.iter().position(|&c| c != b'/')?;
    let rest = &path[start..];
    let len = rest.find('/').unwrap_or(rest.len());
    let name = &rest[..len];
    let after = &rest[len..];
    let next_start = after.find(|c: char| c != '/').unwrap_or(after.len());
    Some((&after[next_start..], name))
}

impl Filesystem {
    /// Resolve `path` to its inode, starting from the root. The root path
    /// `/` returns inode 0 without any lookup.
    pub fn resolve(&self, path: &str) -> Result<Dinode> {
        self.resolve_from(ROOTINO, path)
    }

    fn resolve_from(&self, start_ino: u32, path: &str) -> Result<Dinode> {
        let mut current = self.read_inode(start_ino)?;
        let mut rest = path;
        loop {
            let Some((next_rest, name)) = skip_elem(rest) else {
                return Ok(current);
            };
            if current.typ != InodeType::Dir {
                return Err(FsError::NotADirectory);
            }
            let entry = self.dir_lookup(&current, name.as_bytes())?;
            current = self.read_inode(entry.ino)?;
            rest = next_rest;
        }
    }

    /// Split the final component off `path` and resolve everything before
    /// it, returning `(parent_inode, basename)`. This is how
    /// `mkdir`/`create`/`rmdir`/`unlink` locate the directory they mutate.
    pub fn resolve_parent<'a>(&self, path: &'a str) -> Result<(Dinode, &'a str)> {
        let trimmed = path.trim_end_matches('/');
        let slash = trimmed.rfind('/').ok_or(FsError::NotFound)?;
        let (parent_path, basename) = trimmed.split_at(slash);
        let basename = &basename[1..];
        if basename.is_empty() {
            return Err(FsError::InvalidName);
        }
        let parent_path = if parent_path.is_empty() { "/" } else { parent_path };
        let parent = self.resolve(parent_path)?;
        if parent.typ != InodeType::Dir {
            return Err(FsError::NotADirectory);
        }
        Ok((parent, basename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::inode::InodeType;
    use crate::fs::test_support::fresh_fs;

    #[test]
    fn skip_elem_walks_components() {
        assert_eq!(skip_elem("a/bb/c"), Some(("bb/c", "a")));
        assert_eq!(skip_elem("///a//bb"), Some(("bb", "a")));
        assert_eq!(skip_elem("a"), Some(("", "a")));
        assert_eq!(skip_elem(""), None);
        assert_eq!(skip_elem("////"), None);
    }

    #[test]
    fn root_resolves_without_lookup() {
        let fs = fresh_fs();
        let root = fs.resolve("/").unwrap();
        assert_eq!(root.ino, ROOTINO);
    }

    #[test]
    fn resolve_nested_path() {
        let mut fs = fresh_fs();
        let mut root = fs.read_inode(0).unwrap();
        let dir_ino = fs.alloc_inode().unwrap();
        let dir = Dinode::new(dir_ino, InodeType::Dir, 0o755);
        fs.write_inode(&dir).unwrap();
        fs.dir_add(&mut root, dir_ino, b"sub").unwrap();

        let mut dir = fs.read_inode(dir_ino).unwrap();
        let file_ino = fs.alloc_inode().unwrap();
        let file = Dinode::new(file_ino, InodeType::File, 0o644);
        fs.write_inode(&file).unwrap();
        fs.dir_add(&mut dir, file_ino, b"leaf").unwrap();

        let found = fs.resolve("/sub/leaf").unwrap();
        assert_eq!(found.ino, file_ino);
    }

    #[test]
    fn resolve_missing_component_is_not_found() {
        let fs = fresh_fs();
        assert!(matches!(
            fs.resolve("/nope"),
            Err(crate::error::FsError::NotFound)
        ));
    }

    #[test]
    fn resolve_through_file_is_not_a_directory() {
        let mut fs = fresh_fs();
        let mut root = fs.read_inode(0).unwrap();
        let file_ino = fs.alloc_inode().unwrap();
        let file = Dinode::new(file_ino, InodeType::File, 0o644);
        fs.write_inode(&file).unwrap();
        fs.dir_add(&mut root, file_ino, b"leaf").unwrap();

        assert!(matches!(
            fs.resolve("/leaf/more"),
            Err(crate::error::FsError::NotADirectory)
        ));
    }

    #[test]
    fn resolve_parent_splits_basename() {
        let fs = fresh_fs();
        let (parent, base) = fs.resolve_parent("/a.txt").unwrap();
        assert_eq!(parent.ino, ROOTINO);
        assert_eq!(base, "a.txt");
    }
}
