//! Path-keyed entry table shared by the in-memory and tar sources.

use std::collections::HashMap;

use crate::ExtractionError;
use crate::Result;
use crate::types::Entry;
use crate::types::logical_path;

/// Entries by normalized logical path plus per-directory child order.
///
/// Inserting an entry whose ancestors are missing synthesizes them as
/// root-owned `0755` directories. Child names keep first-insertion order;
/// re-inserting a path replaces its metadata in place.
#[derive(Debug, Clone)]
pub(crate) struct TreeIndex {
    entries: HashMap<String, Entry>,
    children: HashMap<String, Vec<String>>,
}

impl TreeIndex {
    pub(crate) fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert("/".to_string(), Entry::directory("/"));
        Self {
            entries,
            children: HashMap::new(),
        }
    }

    /// Inserts `entry` under its normalized path and returns that path.
    pub(crate) fn insert(&mut self, entry: Entry) -> Result<String> {
        let path = logical_path::normalize(entry.path())?;
        if path == "/" {
            let root = entry.with_path("/");
            if !root.is_dir() {
                return Err(ExtractionError::InvalidArchive(
                    "image root is not a directory".to_string(),
                ));
            }
            self.entries.insert(path.clone(), root);
            return Ok(path);
        }

        let ancestors: Vec<String> = logical_path::ancestors(&path).map(str::to_string).collect();
        for ancestor in ancestors {
            if !self.entries.contains_key(&ancestor) {
                self.link(&ancestor);
                self.entries
                    .insert(ancestor.clone(), Entry::directory(ancestor.as_str()));
            }
        }

        if !self.entries.contains_key(&path) {
            self.link(&path);
        }
        self.entries.insert(path.clone(), entry.with_path(path.as_str()));
        Ok(path)
    }

    fn link(&mut self, path: &str) {
        let parent = logical_path::parent(path).to_string();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        self.children.entry(parent).or_default().push(name);
    }

    pub(crate) fn get(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }

    pub(crate) fn lookup(&self, path: &str) -> Result<Entry> {
        let normalized = logical_path::normalize(path)?;
        self.entries
            .get(&normalized)
            .cloned()
            .ok_or(ExtractionError::NotFound { path: normalized })
    }

    pub(crate) fn list_children(&self, dir: &Entry) -> Result<Vec<String>> {
        let normalized = logical_path::normalize(dir.path())?;
        match self.entries.get(&normalized) {
            None => Err(ExtractionError::NotFound { path: normalized }),
            Some(found) if !found.is_dir() => Err(ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("{normalized} is not a directory"),
            ))),
            Some(_) => Ok(self.children.get(&normalized).cloned().unwrap_or_default()),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
