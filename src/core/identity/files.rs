//! File index: portable file id → local blob location

use crate::domain::PortableId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A file record resolved to a local path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub mime_type: String,
    pub size: u64,
    pub original_filename: String,
    /// Written by this run and deleted afterwards
    pub temporary: bool,
}

impl ResolvedFile {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[derive(Debug, Default)]
pub struct FileIndex {
    entries: HashMap<PortableId, ResolvedFile>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uuid: PortableId, file: ResolvedFile) {
        self.entries.insert(uuid, file);
    }

    pub fn get(&self, uuid: &PortableId) -> Option<&ResolvedFile> {
        self.entries.get(uuid)
    }

    pub fn contains(&self, uuid: &PortableId) -> bool {
        self.entries.contains_key(uuid)
    }

    /// Paths written by this run
    pub fn temporary_paths(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .values()
            .filter(|file| file.temporary)
            .map(|file| file.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_paths() {
        let mut index = FileIndex::new();
        let file = |path: &str, temporary| ResolvedFile {
            path: PathBuf::from(path),
            mime_type: "image/png".to_string(),
            size: 3,
            original_filename: "a.png".to_string(),
            temporary,
        };
        index.insert(PortableId::new("f1").unwrap(), file("/tmp/f1", true));
        index.insert(PortableId::new("f2").unwrap(), file("/data/f2", false));

        let temp: Vec<&Path> = index.temporary_paths().collect();
        assert_eq!(temp, vec![Path::new("/tmp/f1")]);
        assert!(index.get(&PortableId::new("f2").unwrap()).unwrap().is_image());
    }
}
