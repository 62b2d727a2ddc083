//! File access collaborator trait.
//!
//! The engine never touches the filesystem directly; everything goes
//! through this seam so tests can run against in-memory trees and the
//! real implementation can live with the rest of the toolchain glue.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::{ConfigError, Result};

/// Synchronous file access used by the engine. Paths use `/` separators
/// and are resolved relative to the process working directory.
pub trait FileLoader {
    /// Read a file as text.
    fn load(&self, path: &str) -> Result<String>;

    /// Write a file, creating or truncating it.
    fn save(&self, path: &str, contents: &str) -> Result<()>;

    /// Copy a file, overwriting the destination.
    fn copy(&self, from: &str, to: &str) -> Result<()>;

    /// Delete a file or directory tree. Best effort; never fails.
    fn remove(&self, path: &str);

    /// Create a directory (and parents).
    fn make_dir(&self, path: &str) -> Result<()>;

    /// Probe for a single file, returning its path when present.
    fn find_file(&self, path: &str) -> Option<String>;

    /// Enumerate files under `dir` with the given extension.
    fn find_files(&self, dir: &str, ext: &str, recursive: bool) -> Vec<String>;
}

/// In-memory [`FileLoader`] backed by a path → contents map.
///
/// The primary implementation for tests; also used for re-scanning
/// preprocessed text that never hits disk.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: RefCell<BTreeMap<String, String>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), contents.into());
    }

    /// Contents of a previously saved file, if any.
    pub fn get(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }
}

impl FileLoader for MemoryLoader {
    fn load(&self, path: &str) -> Result<String> {
        self.get(path).ok_or_else(|| ConfigError::FileLoad(path.to_string()))
    }

    fn save(&self, path: &str, contents: &str) -> Result<()> {
        self.insert(path, contents);
        Ok(())
    }

    fn copy(&self, from: &str, to: &str) -> Result<()> {
        let contents = self.load(from)?;
        self.insert(to, contents);
        Ok(())
    }

    fn remove(&self, path: &str) {
        let mut files = self.files.borrow_mut();
        files.retain(|p, _| p != path && !p.starts_with(&format!("{}/", path)));
    }

    fn make_dir(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    fn find_file(&self, path: &str) -> Option<String> {
        let normalized = path.trim_start_matches("./");
        let files = self.files.borrow();
        files
            .keys()
            .find(|p| p.trim_start_matches("./") == normalized)
            .cloned()
    }

    fn find_files(&self, dir: &str, ext: &str, recursive: bool) -> Vec<String> {
        let dir = dir.trim_start_matches("./").trim_end_matches('/');
        let files = self.files.borrow();
        files
            .keys()
            .filter(|p| {
                let p = p.trim_start_matches("./");
                let Some(rest) = p.strip_prefix(dir).and_then(|r| r.strip_prefix('/')) else {
                    return false;
                };
                (recursive || !rest.contains('/')) && rest.ends_with(ext)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_loader_roundtrip() {
        let loader = MemoryLoader::new();
        loader.insert("src/a.c", "int x;");
        assert_eq!(loader.load("src/a.c").unwrap(), "int x;");
        assert!(loader.load("src/b.c").is_err());
        loader.save("src/b.c", "int y;").unwrap();
        assert_eq!(loader.find_file("./src/b.c"), Some("src/b.c".to_string()));
    }

    #[test]
    fn find_files_respects_recursion() {
        let loader = MemoryLoader::new();
        loader.insert("proj/a.c", "");
        loader.insert("proj/x86/b.c", "");
        loader.insert("proj/a.h", "");
        let flat = loader.find_files("proj", ".c", false);
        assert_eq!(flat, vec!["proj/a.c".to_string()]);
        let deep = loader.find_files("proj", ".c", true);
        assert_eq!(deep.len(), 2);
    }
}
