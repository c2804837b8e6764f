//! Persistence boundary
//!
//! The engine never touches documents directly: it asks a [`GraphStore`] to
//! load a graph and to write one back. Writes are whole-document.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::types::ObjectKind;

pub trait GraphStore: Send + Sync {
    fn load(&self, path: &Path) -> Result<ProjectGraph>;

    fn persist(&self, graph: &ProjectGraph, path: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// Project documents stored as pretty-printed JSON files
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGraphStore;

impl JsonGraphStore {
    pub fn new() -> Self {
        Self
    }
}

/// Sibling file the new document is written to before it replaces the old one
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl GraphStore for JsonGraphStore {
    fn load(&self, path: &Path) -> Result<ProjectGraph> {
        if !path.exists() {
            return Err(GraphError::not_found(
                ObjectKind::Project,
                path.display().to_string(),
            ));
        }
        let content = fs::read_to_string(path)?;
        let mut graph: ProjectGraph = serde_json::from_str(&content)?;
        if let Some(dir) = path.parent() {
            graph.set_source_root(dir);
        }
        tracing::debug!("Loaded {} ({} objects)", path.display(), graph.objects.len());
        Ok(graph)
    }

    fn persist(&self, graph: &ProjectGraph, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(graph)?;
        let staging = staging_path(path);
        fs::write(&staging, json)?;
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        tracing::debug!("Wrote {} ({} objects)", path.display(), graph.objects.len());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// In-process store keyed by path, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    documents: Mutex<HashMap<PathBuf, String>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw serialized document, if one was persisted under `path`
    pub fn document(&self, path: &Path) -> Option<String> {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }
}

impl GraphStore for MemoryGraphStore {
    fn load(&self, path: &Path) -> Result<ProjectGraph> {
        let json = self
            .document(path)
            .ok_or_else(|| GraphError::not_found(ObjectKind::Project, path.display().to_string()))?;
        let mut graph: ProjectGraph = serde_json::from_str(&json)?;
        if let Some(dir) = path.parent() {
            graph.set_source_root(dir);
        }
        Ok(graph)
    }

    fn persist(&self, graph: &ProjectGraph, path: &Path) -> Result<()> {
        let json = serde_json::to_string(graph)?;
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), json);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Group;
    use tempfile::TempDir;

    #[test]
    fn test_json_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Demo/project.pbxgraph.json");
        let store = JsonGraphStore::new();

        let mut graph = ProjectGraph::new("Demo");
        let main = graph.main_group().unwrap();
        let models = graph.objects.insert(Group::named("Models"));
        graph.objects.get_mut::<Group>(&main).unwrap().children.insert(0, models);
        store.persist(&graph, &path).unwrap();
        assert!(!staging_path(&path).exists());

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded.objects, graph.objects);
        assert_eq!(loaded.source_root(), dir.path().join("Demo"));
        assert!(loaded.find_group("Models").is_ok());
    }

    #[test]
    fn test_load_missing_document() {
        let dir = TempDir::new().unwrap();
        let store = JsonGraphStore::new();
        assert!(matches!(
            store.load(&dir.path().join("missing.json")),
            Err(GraphError::NotFound { kind: ObjectKind::Project, .. })
        ));
    }

    #[test]
    fn test_load_corrupt_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonGraphStore::new().load(&path),
            Err(GraphError::Serialization(_))
        ));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryGraphStore::new();
        let path = Path::new("/virtual/Demo/project.json");
        assert!(!store.exists(path));
        store.persist(&ProjectGraph::new("Demo"), path).unwrap();
        assert!(store.exists(path));
        let graph = store.load(path).unwrap();
        assert_eq!(graph.project().unwrap().name, "Demo");
        assert_eq!(graph.source_root(), Path::new("/virtual/Demo"));
    }
}
