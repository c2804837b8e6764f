//! The project graph: node store plus the root project entity

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{GraphError, Result};
use crate::store::NodeStore;
use crate::types::{
    BuildSettings, Configuration, ConfigurationList, Dependency, ExceptionSet, Group, Object,
    ObjectId, ObjectKind, Project, SettingValue, SyncGroup, Target,
};

pub const ARCHIVE_VERSION: u32 = 1;
pub const OBJECT_VERSION: u32 = 77;

/// In-memory project document.
///
/// Built fresh for every call (load, mutate, persist); nothing is shared
/// between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGraph {
    #[serde(default = "default_archive_version")]
    pub archive_version: u32,
    #[serde(default = "default_object_version")]
    pub object_version: u32,
    pub root_object: ObjectId,
    pub objects: NodeStore,
    /// Directory project-relative paths are resolved against
    #[serde(skip)]
    source_root: PathBuf,
}

fn default_archive_version() -> u32 {
    ARCHIVE_VERSION
}

fn default_object_version() -> u32 {
    OBJECT_VERSION
}

impl ProjectGraph {
    /// Create an empty project: main group, products group and a project-level
    /// Debug/Release configuration list.
    pub fn new(name: &str) -> Self {
        let mut objects = NodeStore::new();

        let products_group = objects.insert(Group::named("Products"));
        let mut main = Group::default();
        main.children.push(products_group.clone());
        let main_group = objects.insert(main);

        let debug = objects.insert(Configuration {
            name: "Debug".to_string(),
            build_settings: project_settings(true),
        });
        let release = objects.insert(Configuration {
            name: "Release".to_string(),
            build_settings: project_settings(false),
        });
        let build_configuration_list = objects.insert(ConfigurationList {
            configurations: vec![debug, release],
            default_configuration_name: "Release".to_string(),
        });

        let root_object = objects.insert(Project {
            name: name.to_string(),
            main_group,
            products_group,
            build_configuration_list,
            targets: Vec::new(),
            remote_packages: Vec::new(),
            local_packages: Vec::new(),
        });

        Self {
            archive_version: ARCHIVE_VERSION,
            object_version: OBJECT_VERSION,
            root_object,
            objects,
            source_root: PathBuf::from("."),
        }
    }

    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    pub fn set_source_root(&mut self, root: impl Into<PathBuf>) {
        self.source_root = root.into();
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn project(&self) -> Result<&Project> {
        self.objects.get::<Project>(&self.root_object)
    }

    pub fn project_mut(&mut self) -> Result<&mut Project> {
        self.objects.get_mut::<Project>(&self.root_object)
    }

    pub fn main_group(&self) -> Result<ObjectId> {
        Ok(self.project()?.main_group.clone())
    }

    pub fn products_group(&self) -> Result<ObjectId> {
        Ok(self.project()?.products_group.clone())
    }

    /// Targets in project order
    pub fn targets(&self) -> Result<Vec<(ObjectId, &Target)>> {
        self.project()?
            .targets
            .iter()
            .map(|id| Ok((id.clone(), self.objects.get::<Target>(id)?)))
            .collect()
    }

    /// Parent of a group-tree node, computed by scanning owners
    pub fn parent_group(&self, id: &ObjectId) -> Option<ObjectId> {
        self.objects
            .iter::<Group>()
            .find(|(_, group)| group.children.contains(id))
            .map(|(parent, _)| parent.clone())
    }

    /// Check every invariant of the document and report all violations
    pub fn validate(&self) -> Result<()> {
        let problems = self.violations();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(GraphError::Validation(problems.join("; ")))
        }
    }

    pub fn violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        // Dangling links
        for (id, object) in self.objects.iter_all() {
            for target in object.references() {
                if !self.objects.contains(target) {
                    problems.push(format!(
                        "{} {} refers to missing object {}",
                        object.kind(),
                        id,
                        target
                    ));
                }
            }
        }

        let project = match self.project() {
            Ok(project) => project,
            Err(_) => {
                problems.push(format!("root object {} is not a project", self.root_object));
                return problems;
            }
        };

        // Unique target names
        let mut names = HashSet::new();
        for id in &project.targets {
            if let Ok(target) = self.objects.get::<Target>(id) {
                if !names.insert(target.name.as_str()) {
                    problems.push(format!("duplicate target name '{}'", target.name));
                }
            }
        }

        // Single ownership: no entity owned twice
        let mut owners: HashMap<&ObjectId, &ObjectId> = HashMap::new();
        for (id, object) in self.objects.iter_all() {
            for child in object.owned() {
                if let Some(previous) = owners.insert(child, id) {
                    problems.push(format!(
                        "{} is owned by both {} and {}",
                        child, previous, id
                    ));
                }
            }
        }

        // Group tree is acyclic and rooted at the main group
        let mut visited = HashSet::new();
        let mut stack = vec![(project.main_group.clone(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id.clone()) {
                problems.push(format!("group tree visits {} twice", id));
                continue;
            }
            if depth > self.objects.len() {
                problems.push("group tree is cyclic".to_string());
                break;
            }
            if let Ok(group) = self.objects.get::<Group>(&id) {
                stack.extend(group.children.iter().map(|c| (c.clone(), depth + 1)));
            }
        }
        for (id, _) in self.objects.iter::<Group>() {
            if !visited.contains(id) {
                problems.push(format!("group {} is not reachable from the main group", id));
            }
        }

        // Exception sets and dependencies point at live targets
        for (id, set) in self.objects.iter::<ExceptionSet>() {
            if self.objects.get::<Target>(&set.target).is_err() {
                problems.push(format!("exception set {} refers to a removed target", id));
            }
        }
        for (target_id, target) in self.objects.iter::<Target>() {
            for dep_id in &target.dependencies {
                if let Ok(dep) = self.objects.get::<Dependency>(dep_id) {
                    if &dep.target == target_id {
                        problems.push(format!("target '{}' depends on itself", target.name));
                    }
                }
            }
            if let Some(folder) = &target.folder_group {
                if *folder == project.main_group || *folder == project.products_group {
                    problems.push(format!(
                        "target '{}' claims built-in group {} as its folder",
                        target.name, folder
                    ));
                }
            }
            for sync_id in &target.synchronized_groups {
                if self.objects.get::<SyncGroup>(sync_id).is_err() {
                    problems.push(format!(
                        "target '{}' references missing synchronized folder {}",
                        target.name, sync_id
                    ));
                }
            }
        }

        problems
    }

    /// Kind of an object, for messages
    pub fn kind_of(&self, id: &ObjectId) -> Option<ObjectKind> {
        self.objects.object(id).map(Object::kind)
    }
}

fn project_settings(debug: bool) -> BuildSettings {
    let mut settings = BuildSettings::new();
    settings.insert("ALWAYS_SEARCH_USER_PATHS".into(), "NO".into());
    settings.insert("CLANG_ENABLE_MODULES".into(), "YES".into());
    settings.insert("ENABLE_STRICT_OBJC_MSGSEND".into(), "YES".into());
    settings.insert("GCC_C_LANGUAGE_STANDARD".into(), "gnu17".into());
    if debug {
        settings.insert("DEBUG_INFORMATION_FORMAT".into(), "dwarf".into());
        settings.insert("ENABLE_TESTABILITY".into(), "YES".into());
        settings.insert("GCC_OPTIMIZATION_LEVEL".into(), "0".into());
        settings.insert("ONLY_ACTIVE_ARCH".into(), "YES".into());
        settings.insert(
            "SWIFT_ACTIVE_COMPILATION_CONDITIONS".into(),
            SettingValue::Array(vec!["DEBUG".into(), "$(inherited)".into()]),
        );
        settings.insert("SWIFT_OPTIMIZATION_LEVEL".into(), "-Onone".into());
    } else {
        settings.insert("DEBUG_INFORMATION_FORMAT".into(), "dwarf-with-dsym".into());
        settings.insert("ENABLE_NS_ASSERTIONS".into(), "NO".into());
        settings.insert("SWIFT_COMPILATION_MODE".into(), "wholemodule".into());
        settings.insert("VALIDATE_PRODUCT".into(), "YES".into());
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_is_valid() {
        let graph = ProjectGraph::new("Demo");
        graph.validate().unwrap();
        let project = graph.project().unwrap();
        assert_eq!(project.name, "Demo");
        let main = graph.objects.get::<Group>(&project.main_group).unwrap();
        assert_eq!(main.children, vec![project.products_group.clone()]);
        assert!(graph.targets().unwrap().is_empty());
    }

    #[test]
    fn test_validate_reports_dangling_reference() {
        let mut graph = ProjectGraph::new("Demo");
        let main = graph.main_group().unwrap();
        graph
            .objects
            .get_mut::<Group>(&main)
            .unwrap()
            .children
            .push(ObjectId::from("DEADBEEFDEADBEEFDEADBEEF"));
        let err = graph.validate().unwrap_err();
        assert!(err.to_string().contains("missing object DEADBEEFDEADBEEFDEADBEEF"));
    }

    #[test]
    fn test_validate_reports_cycle() {
        let mut graph = ProjectGraph::new("Demo");
        let main = graph.main_group().unwrap();
        let child = graph.objects.insert(Group::named("Loop"));
        graph.objects.get_mut::<Group>(&main).unwrap().children.push(child.clone());
        graph.objects.get_mut::<Group>(&child).unwrap().children.push(main.clone());
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_document_round_trip() {
        let graph = ProjectGraph::new("Demo");
        let json = serde_json::to_string_pretty(&graph).unwrap();
        assert!(json.contains("\"rootObject\""));
        assert!(json.contains("\"isa\": \"PBXProject\""));
        let back: ProjectGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.root_object, graph.root_object);
        assert_eq!(back.objects, graph.objects);
    }
}
