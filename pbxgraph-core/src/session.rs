//! Transactions against stored project documents
//!
//! Each call loads its own graph, mutates it, validates every invariant and
//! writes it back. Calls against the same document are serialized by a
//! per-path lock so two concurrent edits cannot lose each other's changes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::ops::Mutation;
use crate::path_utils::clean_path;
use crate::persist::{GraphStore, JsonGraphStore};
use crate::types::ObjectKind;

pub struct Workspace<S: GraphStore = JsonGraphStore> {
    store: S,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl Workspace<JsonGraphStore> {
    pub fn new() -> Self {
        Self::with_store(JsonGraphStore::new())
    }
}

impl Default for Workspace<JsonGraphStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GraphStore> Workspace<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Single-writer lock of one document
    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(clean_path(path))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load, mutate, validate and persist one document.
    ///
    /// Nothing is written when `f` fails, when the result is invalid or when
    /// the mutation reports no change.
    pub fn edit<R, F>(&self, path: &Path, f: F) -> Result<R>
    where
        R: Mutation,
        F: FnOnce(&mut ProjectGraph) -> Result<R>,
    {
        let lock = self.lock_for(path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut graph = self.store.load(path)?;
        let result = f(&mut graph)?;
        if result.is_applied() {
            graph.validate()?;
            self.store.persist(&graph, path)?;
        } else {
            tracing::debug!("No change to {}, not persisting", path.display());
        }
        Ok(result)
    }

    /// Load a document and read from it under its lock
    pub fn read<R>(&self, path: &Path, f: impl FnOnce(&ProjectGraph) -> Result<R>) -> Result<R> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        let graph = self.store.load(path)?;
        f(&graph)
    }

    /// Write a brand-new document; an existing one is never overwritten
    pub fn create(&self, path: &Path, graph: &ProjectGraph) -> Result<()> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.store.exists(path) {
            return Err(GraphError::already_exists(
                ObjectKind::Project,
                path.display().to_string(),
            ));
        }
        graph.validate()?;
        self.store.persist(graph, path)?;
        tracing::info!("Created project document {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ops::targets::{create_target, TargetSpec};
    use crate::ops::Outcome;
    use crate::persist::MemoryGraphStore;
    use crate::types::{Group, ProductType};
    use std::thread;

    const DOC: &str = "/virtual/Demo/project.json";

    fn workspace() -> Workspace<MemoryGraphStore> {
        let workspace = Workspace::with_store(MemoryGraphStore::new());
        workspace
            .create(Path::new(DOC), &ProjectGraph::new("Demo"))
            .unwrap();
        workspace
    }

    #[test]
    fn test_create_refuses_existing_document() {
        let workspace = workspace();
        assert!(matches!(
            workspace.create(Path::new(DOC), &ProjectGraph::new("Other")),
            Err(GraphError::AlreadyExists { kind: ObjectKind::Project, .. })
        ));
    }

    #[test]
    fn test_edit_persists_applied_changes() {
        let workspace = workspace();
        let path = Path::new(DOC);
        workspace
            .edit(path, |graph| {
                create_target(
                    graph,
                    &EngineConfig::default(),
                    &TargetSpec::new("App", ProductType::Application),
                )
            })
            .unwrap();
        let names = workspace
            .read(path, |graph| {
                Ok(graph
                    .targets()?
                    .into_iter()
                    .map(|(_, t)| t.name.clone())
                    .collect::<Vec<_>>())
            })
            .unwrap();
        assert_eq!(names, vec!["App".to_string()]);
    }

    #[test]
    fn test_failed_or_unchanged_edit_writes_nothing() {
        let workspace = workspace();
        let path = Path::new(DOC);
        let before = workspace.store().document(path);

        let failed: Result<Outcome> = workspace.edit(path, |graph| {
            graph.project_mut()?.name = "Renamed".into();
            Err(GraphError::InvalidArgument("boom".into()))
        });
        assert!(failed.is_err());

        workspace
            .edit(path, |graph| {
                graph.project_mut()?.name = "Renamed".into();
                Ok(Outcome::unchanged("nothing to do"))
            })
            .unwrap();
        assert_eq!(workspace.store().document(path), before);
    }

    #[test]
    fn test_invalid_graph_is_not_persisted() {
        let workspace = workspace();
        let path = Path::new(DOC);
        let before = workspace.store().document(path);
        let result = workspace.edit(path, |graph| {
            // Orphan group outside the tree
            graph.objects.insert(Group::named("Loose"));
            Ok(Outcome::applied("added"))
        });
        assert!(matches!(result, Err(GraphError::Validation(_))));
        assert_eq!(workspace.store().document(path), before);
    }

    #[test]
    fn test_concurrent_edits_do_not_lose_updates() {
        let workspace = Arc::new(workspace());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let workspace = Arc::clone(&workspace);
                thread::spawn(move || {
                    workspace
                        .edit(Path::new(DOC), |graph| {
                            create_target(
                                graph,
                                &EngineConfig::default(),
                                &TargetSpec::new(format!("Target{}", i), ProductType::Framework),
                            )
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let count = workspace
            .read(Path::new(DOC), |graph| Ok(graph.targets()?.len()))
            .unwrap();
        assert_eq!(count, 8);
    }
}
