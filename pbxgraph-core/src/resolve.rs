//! Reference resolver
//!
//! Name- and path-based lookups across the node store. Each entity kind has one
//! documented resolution policy:
//!
//! - targets: exact name
//! - groups: slash-separated components, each matched against a child group's
//!   name or path; the first unmatched component is reported
//! - synchronized folders: recursive search of the group tree by path, full
//!   path or name
//! - file references: first match over the candidates project-relative path,
//!   raw caller string, bare file name (in that order)
//! - remote packages: repository URL, ignoring case, trailing `/` and `.git`
//! - local packages: normalized relative path

use std::path::{Path, PathBuf};

use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::path_utils::{candidate_paths, normalize_path, project_relative, split_components};
use crate::types::{
    BuildFile, BuildPhase, Configuration, ConfigurationList, FileReference, Group,
    LocalPackage, Object, ObjectId, ObjectKind, PhaseVariant, RemotePackage, SourceTree,
    SyncGroup, Target,
};

impl ProjectGraph {
    pub fn find_target(&self, name: &str) -> Result<ObjectId> {
        self.targets()?
            .into_iter()
            .find(|(_, target)| target.name == name)
            .map(|(id, _)| id)
            .ok_or_else(|| GraphError::not_found(ObjectKind::Target, name))
    }

    pub fn target(&self, id: &ObjectId) -> Result<&Target> {
        self.objects.get::<Target>(id)
    }

    /// Resolve a slash-separated group path from the main group. An empty path
    /// is the main group itself.
    pub fn find_group(&self, path: &str) -> Result<ObjectId> {
        let mut current = self.main_group()?;
        for component in split_components(path) {
            let group = self.objects.get::<Group>(&current)?;
            current = group
                .children
                .iter()
                .find(|child| {
                    self.objects
                        .get::<Group>(child)
                        .map(|g| g.matches(component))
                        .unwrap_or(false)
                })
                .cloned()
                .ok_or_else(|| GraphError::GroupPathNotFound {
                    path: path.to_string(),
                    component: component.to_string(),
                })?;
        }
        Ok(current)
    }

    /// Optional group path: `None` or empty means the main group
    pub fn find_group_or_main(&self, path: Option<&str>) -> Result<ObjectId> {
        match path {
            Some(p) if !p.trim().is_empty() => self.find_group(p),
            _ => self.main_group(),
        }
    }

    /// Direct child group of `parent` with the given name
    pub fn child_group(&self, parent: &ObjectId, name: &str) -> Option<ObjectId> {
        let group = self.objects.get::<Group>(parent).ok()?;
        group
            .children
            .iter()
            .find(|child| {
                self.objects
                    .get::<Group>(child)
                    .map(|g| g.matches(name))
                    .unwrap_or(false)
            })
            .cloned()
    }

    /// Folder group the target created for itself. The built-in main and
    /// products groups never count, even in a hand-edited document.
    pub fn target_folder_group(&self, target: &ObjectId) -> Option<ObjectId> {
        let folder = self.target(target).ok()?.folder_group.clone()?;
        let builtin = [self.main_group().ok()?, self.products_group().ok()?];
        (!builtin.contains(&folder) && self.objects.get::<Group>(&folder).is_ok()).then_some(folder)
    }

    /// Find a synchronized folder anywhere in the group tree
    pub fn find_sync_folder(&self, path: &str) -> Result<ObjectId> {
        let wanted = project_relative(self.source_root(), path);
        let wanted = wanted.trim_end_matches('/');
        let raw = normalize_path(path);
        let raw = raw.trim_end_matches('/');
        let main = self.main_group()?;
        let mut pending = vec![main];
        while let Some(id) = pending.pop() {
            if let Ok(group) = self.objects.get::<Group>(&id) {
                pending.extend(group.children.iter().cloned());
                continue;
            }
            if let Ok(sync) = self.objects.get::<SyncGroup>(&id) {
                let full = self.full_path(&id);
                if sync.path == wanted
                    || sync.path == raw
                    || full == wanted
                    || sync.name.as_deref() == Some(raw)
                {
                    return Ok(id);
                }
            }
        }
        Err(GraphError::not_found(ObjectKind::SyncGroup, path))
    }

    /// Every synchronized folder in the group tree, in tree order
    pub fn sync_folders(&self) -> Vec<ObjectId> {
        let mut found = Vec::new();
        let Ok(main) = self.main_group() else {
            return found;
        };
        let mut pending = vec![main];
        while let Some(id) = pending.pop() {
            if let Ok(group) = self.objects.get::<Group>(&id) {
                pending.extend(group.children.iter().rev().cloned());
            } else if self.objects.get::<SyncGroup>(&id).is_ok() {
                found.push(id);
            }
        }
        found
    }

    /// Resolve a caller-supplied file spelling to a file reference
    pub fn find_file_reference(&self, raw: &str) -> Result<ObjectId> {
        let candidates = candidate_paths(self.source_root(), raw);
        for candidate in &candidates {
            let hit = self
                .objects
                .iter::<FileReference>()
                .find(|(id, file)| {
                    file.path == *candidate
                        || file.display_name() == candidate
                        || self.full_path(id) == *candidate
                })
                .map(|(id, _)| id.clone());
            if let Some(id) = hit {
                return Ok(id);
            }
        }
        Err(GraphError::not_found(ObjectKind::FileReference, raw))
    }

    /// Group-tree path of a node, joining the `path` of every group-relative
    /// ancestor. A SOURCE_ROOT anchor restarts the path at the project root.
    pub fn full_path(&self, id: &ObjectId) -> String {
        let mut chain = vec![id.clone()];
        let mut current = id.clone();
        while let Some(parent) = self.parent_group(&current) {
            chain.push(parent.clone());
            current = parent;
        }

        let mut parts: Vec<String> = Vec::new();
        for node in chain.iter().rev() {
            let (path, tree) = match self.objects.object(node) {
                Some(Object::Group(g)) => (g.path.clone(), g.source_tree),
                Some(Object::SyncGroup(g)) => (Some(g.path.clone()), g.source_tree),
                Some(Object::FileReference(f)) => (Some(f.path.clone()), f.source_tree),
                _ => (None, SourceTree::Group),
            };
            match tree {
                SourceTree::Group => {}
                SourceTree::SourceRoot | SourceTree::Absolute => parts.clear(),
                SourceTree::BuiltProductsDir => {
                    parts.clear();
                    parts.push("$(BUILT_PRODUCTS_DIR)".to_string());
                }
                SourceTree::SdkRoot => {
                    parts.clear();
                    parts.push("$(SDKROOT)".to_string());
                }
                SourceTree::DeveloperDir => {
                    parts.clear();
                    parts.push("$(DEVELOPER_DIR)".to_string());
                }
            }
            if let Some(path) = path {
                parts.extend(split_components(&path).into_iter().map(str::to_string));
            }
        }
        let joined = parts.join("/");
        if matches!(self.node_source_tree(id), Some(SourceTree::Absolute)) {
            format!("/{}", joined)
        } else {
            joined
        }
    }

    fn node_source_tree(&self, id: &ObjectId) -> Option<SourceTree> {
        match self.objects.object(id)? {
            Object::Group(g) => Some(g.source_tree),
            Object::SyncGroup(g) => Some(g.source_tree),
            Object::FileReference(f) => Some(f.source_tree),
            _ => None,
        }
    }

    /// Location on disk of a group-tree node
    pub fn disk_path(&self, id: &ObjectId) -> PathBuf {
        let full = self.full_path(id);
        let path = Path::new(&full);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.source_root().join(path)
        }
    }

    pub fn find_remote_package(&self, url: &str) -> Result<ObjectId> {
        let wanted = canonical_url(url);
        let project = self.project()?;
        project
            .remote_packages
            .iter()
            .find(|id| {
                self.objects
                    .get::<RemotePackage>(id)
                    .map(|p| canonical_url(&p.repository_url) == wanted)
                    .unwrap_or(false)
            })
            .cloned()
            .ok_or_else(|| GraphError::not_found(ObjectKind::RemotePackage, url))
    }

    pub fn find_local_package(&self, relative_path: &str) -> Result<ObjectId> {
        let wanted = project_relative(self.source_root(), relative_path);
        let wanted = wanted.trim_end_matches('/');
        let project = self.project()?;
        project
            .local_packages
            .iter()
            .find(|id| {
                self.objects
                    .get::<LocalPackage>(id)
                    .map(|p| p.relative_path.trim_end_matches('/') == wanted)
                    .unwrap_or(false)
            })
            .cloned()
            .ok_or_else(|| GraphError::not_found(ObjectKind::LocalPackage, relative_path))
    }

    /// First build phase of a variant on a target
    pub fn find_phase(&self, target: &ObjectId, variant: PhaseVariant) -> Result<Option<ObjectId>> {
        let target = self.target(target)?;
        Ok(target
            .build_phases
            .iter()
            .find(|id| {
                self.objects
                    .get::<BuildPhase>(id)
                    .map(|p| p.kind.variant() == variant)
                    .unwrap_or(false)
            })
            .cloned())
    }

    /// Copy-files phase of a target by display name
    pub fn find_copy_files_phase(&self, target: &ObjectId, name: &str) -> Result<ObjectId> {
        let target_entity = self.target(target)?;
        target_entity
            .build_phases
            .iter()
            .find(|id| {
                self.objects
                    .get::<BuildPhase>(id)
                    .map(|p| p.kind.variant() == PhaseVariant::CopyFiles && p.display_name() == name)
                    .unwrap_or(false)
            })
            .cloned()
            .ok_or_else(|| {
                GraphError::not_found(
                    ObjectKind::BuildPhase,
                    format!("copy files phase '{}' in target '{}'", name, target_entity.name),
                )
            })
    }

    /// Configurations of a list, resolved
    pub fn configurations(&self, list: &ObjectId) -> Result<Vec<(ObjectId, &Configuration)>> {
        let list = self.objects.get::<ConfigurationList>(list)?;
        list.configurations
            .iter()
            .map(|id| Ok((id.clone(), self.objects.get::<Configuration>(id)?)))
            .collect()
    }

    /// Build files (in any phase of any target) that point at a file reference
    pub fn build_files_for(&self, file: &ObjectId) -> Vec<ObjectId> {
        self.objects
            .iter::<BuildFile>()
            .filter(|(_, bf)| bf.file_ref.as_ref() == Some(file) || bf.product_ref.as_ref() == Some(file))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Repository URL reduced for comparison
pub fn canonical_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_groups() -> (ProjectGraph, ObjectId, ObjectId) {
        let mut graph = ProjectGraph::new("Demo").with_source_root("/work/Demo");
        let main = graph.main_group().unwrap();
        let models = graph.objects.insert(Group {
            name: Some("Models".into()),
            path: Some("Models".into()),
            ..Default::default()
        });
        let user = graph.objects.insert(FileReference {
            name: Some("User.swift".into()),
            path: "User.swift".into(),
            source_tree: SourceTree::Group,
            last_known_file_type: Some("sourcecode.swift".into()),
            explicit_file_type: None,
        });
        graph.objects.get_mut::<Group>(&models).unwrap().children.push(user.clone());
        graph.objects.get_mut::<Group>(&main).unwrap().children.push(models.clone());
        (graph, models, user)
    }

    #[test]
    fn test_find_group_reports_failing_component() {
        let (graph, models, _) = graph_with_groups();
        assert_eq!(graph.find_group("Models").unwrap(), models);
        assert_eq!(graph.find_group("").unwrap(), graph.main_group().unwrap());
        match graph.find_group("Models/Entities/Deep") {
            Err(GraphError::GroupPathNotFound { component, .. }) => {
                assert_eq!(component, "Entities")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_find_file_reference_by_each_spelling() {
        let (graph, _, user) = graph_with_groups();
        assert_eq!(graph.find_file_reference("Models/User.swift").unwrap(), user);
        assert_eq!(
            graph.find_file_reference("/work/Demo/Models/User.swift").unwrap(),
            user
        );
        assert_eq!(graph.find_file_reference("User.swift").unwrap(), user);
        assert!(matches!(
            graph.find_file_reference("Order.swift"),
            Err(GraphError::NotFound { kind: ObjectKind::FileReference, .. })
        ));
    }

    #[test]
    fn test_full_and_disk_path() {
        let (graph, _, user) = graph_with_groups();
        assert_eq!(graph.full_path(&user), "Models/User.swift");
        assert_eq!(
            graph.disk_path(&user),
            PathBuf::from("/work/Demo/Models/User.swift")
        );
    }

    #[test]
    fn test_canonical_url() {
        assert_eq!(
            canonical_url("https://github.com/Apple/swift-log.git/"),
            "https://github.com/apple/swift-log"
        );
    }
}
