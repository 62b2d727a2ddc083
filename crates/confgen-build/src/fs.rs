//! On-disk implementation of the engine's file collaborator.

use std::fs;
use std::path::Path;

use confgen_core::{ConfigError, FileLoader};
use walkdir::WalkDir;

/// [`FileLoader`] backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskLoader;

impl DiskLoader {
    pub fn new() -> Self {
        Self
    }
}

impl FileLoader for DiskLoader {
    fn load(&self, path: &str) -> confgen_core::Result<String> {
        fs::read_to_string(path).map_err(|_| ConfigError::FileLoad(path.to_string()))
    }

    fn save(&self, path: &str, contents: &str) -> confgen_core::Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|_| ConfigError::CreateDir(parent.display().to_string()))?;
            }
        }
        fs::write(path, contents).map_err(|_| ConfigError::FileWrite(path.to_string()))
    }

    fn copy(&self, from: &str, to: &str) -> confgen_core::Result<()> {
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|_| ConfigError::FileWrite(to.to_string()))
    }

    fn remove(&self, path: &str) {
        let target = Path::new(path);
        if target.is_dir() {
            let _ = fs::remove_dir_all(target);
        } else {
            let _ = fs::remove_file(target);
        }
    }

    fn make_dir(&self, path: &str) -> confgen_core::Result<()> {
        fs::create_dir_all(path).map_err(|_| ConfigError::CreateDir(path.to_string()))
    }

    fn find_file(&self, path: &str) -> Option<String> {
        Path::new(path).is_file().then(|| path.to_string())
    }

    fn find_files(&self, dir: &str, ext: &str, recursive: bool) -> Vec<String> {
        let walker = if recursive {
            WalkDir::new(dir)
        } else {
            WalkDir::new(dir).max_depth(1)
        };
        let mut files: Vec<String> = walker
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.path().to_str().map(|p| p.replace('\\', "/")))
            .filter(|path| path.ends_with(ext))
            .collect();
        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_discovery() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path().to_str().unwrap().to_string();
        let loader = DiskLoader::new();

        loader.save(&format!("{}/sub/a.c", root), "int x;").unwrap();
        loader.save(&format!("{}/b.c", root), "int y;").unwrap();
        loader.save(&format!("{}/b.h", root), "int y;").unwrap();

        assert_eq!(loader.load(&format!("{}/b.c", root)).unwrap(), "int y;");
        assert!(loader.find_file(&format!("{}/b.c", root)).is_some());
        assert!(loader.find_file(&format!("{}/missing.c", root)).is_none());

        let flat = loader.find_files(&root, ".c", false);
        assert_eq!(flat.len(), 1);
        let deep = loader.find_files(&root, ".c", true);
        assert_eq!(deep.len(), 2);

        loader.remove(&format!("{}/sub", root));
        assert!(loader.find_file(&format!("{}/sub/a.c", root)).is_none());
    }
}
