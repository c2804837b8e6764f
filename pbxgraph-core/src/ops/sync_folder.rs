//! Synchronized folders
//!
//! A synchronized folder is a group bound to a real directory. Every file
//! under it belongs to each target that references the folder, minus the
//! paths listed in that target's exception set.

use serde::Serialize;
use std::collections::BTreeSet;
use walkdir::WalkDir;

use super::{attach_child, purge, staged, Outcome};
use crate::config::SyncConfig;
use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::path_utils::{path_to_string, project_relative};
use crate::types::{ExceptionSet, ObjectId, ObjectKind, SourceTree, SyncGroup, Target};

/// Directory bundles that count as a single file
const BUNDLE_EXTENSIONS: &[&str] = &[
    "xcassets",
    "xcdatamodeld",
    "bundle",
    "framework",
    "xcframework",
    "scnassets",
    "lproj",
];

fn add_membership(graph: &mut ProjectGraph, target: &ObjectId, folder: &ObjectId) -> Result<bool> {
    let target = graph.objects.get_mut::<Target>(target)?;
    if target.synchronized_groups.contains(folder) {
        return Ok(false);
    }
    target.synchronized_groups.push(folder.clone());
    Ok(true)
}

/// Exception set of `target` inside `folder`
fn exception_set(graph: &ProjectGraph, folder: &ObjectId, target: &ObjectId) -> Result<Option<ObjectId>> {
    Ok(graph
        .objects
        .get::<SyncGroup>(folder)?
        .exceptions
        .iter()
        .find(|id| {
            graph
                .objects
                .get::<ExceptionSet>(id)
                .map(|set| &set.target == target)
                .unwrap_or(false)
        })
        .cloned())
}

/// Reduce a caller path to one relative to the folder
fn folder_relative(graph: &ProjectGraph, folder: &ObjectId, raw: &str) -> Result<String> {
    let relative = project_relative(graph.source_root(), raw);
    let folder_path = graph.full_path(folder);
    let stripped = relative
        .strip_prefix(&format!("{}/", folder_path))
        .unwrap_or(&relative)
        .trim_matches('/')
        .to_string();
    if stripped.is_empty() {
        return Err(GraphError::InvalidArgument(format!(
            "'{}' does not name a file inside '{}'",
            raw, folder_path
        )));
    }
    Ok(stripped)
}

/// Add a synchronized folder for a directory, optionally making `target` a
/// member. An existing folder for the same directory is reused.
pub fn add_sync_folder(
    graph: &mut ProjectGraph,
    path: &str,
    target: Option<&str>,
    group: Option<&str>,
) -> Result<Outcome> {
    let relative = project_relative(graph.source_root(), path);
    let relative = relative.trim_matches('/').to_string();
    if relative.is_empty() {
        return Err(GraphError::InvalidArgument("Folder path must not be empty".to_string()));
    }
    let target_id = target.map(|name| graph.find_target(name)).transpose()?;
    let parent = graph.find_group_or_main(group)?;

    staged(graph, |graph| {
        let mut outcomes = Vec::new();
        let folder = match graph.find_sync_folder(&relative) {
            Ok(id) => {
                outcomes.push(Outcome::unchanged(format!(
                    "Synchronized folder '{}' already exists",
                    relative
                )));
                id
            }
            Err(_) => {
                // Under the main group a group-relative path is the project path
                let source_tree = if parent == graph.main_group()? {
                    SourceTree::Group
                } else {
                    SourceTree::SourceRoot
                };
                let id = graph.objects.insert(SyncGroup {
                    path: relative.clone(),
                    name: None,
                    source_tree,
                    exceptions: Vec::new(),
                });
                attach_child(graph, &parent, id.clone())?;
                tracing::info!("Added synchronized folder {}", relative);
                outcomes.push(Outcome::applied(format!(
                    "Added synchronized folder '{}'",
                    relative
                )));
                id
            }
        };

        if let (Some(target_id), Some(name)) = (&target_id, target) {
            if add_membership(graph, target_id, &folder)? {
                outcomes.push(Outcome::applied(format!(
                    "Target '{}' now includes '{}'",
                    name, relative
                )));
            } else {
                outcomes.push(Outcome::unchanged(format!(
                    "Target '{}' already includes '{}'",
                    name, relative
                )));
            }
        }
        Ok(Outcome::merge(outcomes))
    })
}

/// Remove a synchronized folder, its exception sets and every target's
/// membership
pub fn remove_sync_folder(graph: &mut ProjectGraph, path: &str) -> Result<Outcome> {
    let folder = graph.find_sync_folder(path)?;
    let label = graph.full_path(&folder);
    staged(graph, |graph| {
        purge(graph, &folder)?;
        tracing::info!("Removed synchronized folder {}", label);
        Ok(Outcome::applied(format!("Removed synchronized folder '{}'", label)))
    })
}

pub fn add_target_to_sync_folder(graph: &mut ProjectGraph, folder: &str, target: &str) -> Result<Outcome> {
    let folder_id = graph.find_sync_folder(folder)?;
    let target_id = graph.find_target(target)?;
    if add_membership(graph, &target_id, &folder_id)? {
        tracing::info!("Added {} to synchronized folder {}", target, folder);
        Ok(Outcome::applied(format!("Target '{}' now includes '{}'", target, folder)))
    } else {
        Ok(Outcome::unchanged(format!("Target '{}' already includes '{}'", target, folder)))
    }
}

/// Drop a target's membership of a folder together with its exception set
/// there, so no exception set outlives the membership.
pub fn remove_target_from_sync_folder(graph: &mut ProjectGraph, folder: &str, target: &str) -> Result<Outcome> {
    let folder_id = graph.find_sync_folder(folder)?;
    let target_id = graph.find_target(target)?;
    let set = exception_set(graph, &folder_id, &target_id)?;

    staged(graph, |graph| {
        let was_member = graph
            .target(&target_id)?
            .synchronized_groups
            .contains(&folder_id);
        graph
            .objects
            .get_mut::<Target>(&target_id)?
            .synchronized_groups
            .retain(|id| *id != folder_id);
        if let Some(set) = &set {
            purge(graph, set)?;
        }

        if !was_member && set.is_none() {
            return Ok(Outcome::unchanged(format!(
                "Target '{}' does not include '{}'",
                target, folder
            )));
        }
        tracing::info!("Removed {} from synchronized folder {}", target, folder);
        Ok(Outcome::applied(format!(
            "Target '{}' no longer includes '{}'",
            target, folder
        )))
    })
}

/// Exclude files of a folder from one target
pub fn add_sync_exception(
    graph: &mut ProjectGraph,
    folder: &str,
    target: &str,
    files: &[String],
) -> Result<Outcome> {
    if files.is_empty() {
        return Err(GraphError::InvalidArgument("No files given".to_string()));
    }
    let folder_id = graph.find_sync_folder(folder)?;
    let target_id = graph.find_target(target)?;
    let entries = files
        .iter()
        .map(|f| folder_relative(graph, &folder_id, f))
        .collect::<Result<Vec<_>>>()?;

    let set = match exception_set(graph, &folder_id, &target_id)? {
        Some(set) => set,
        None => {
            let set = graph.objects.insert(ExceptionSet {
                target: target_id.clone(),
                membership_exceptions: Vec::new(),
            });
            graph
                .objects
                .get_mut::<SyncGroup>(&folder_id)?
                .exceptions
                .push(set.clone());
            set
        }
    };

    let exceptions = &mut graph.objects.get_mut::<ExceptionSet>(&set)?.membership_exceptions;
    let mut added = Vec::new();
    for entry in entries {
        if !exceptions.contains(&entry) {
            exceptions.push(entry.clone());
            added.push(entry);
        }
    }
    exceptions.sort();

    if added.is_empty() {
        return Ok(Outcome::unchanged(format!(
            "All given files are already excluded from '{}' in '{}'",
            target, folder
        )));
    }
    tracing::info!("Excluded {:?} of {} from {}", added, folder, target);
    Ok(Outcome::applied(format!(
        "Excluded {} from '{}' in '{}'",
        added.join(", "),
        target,
        folder
    )))
}

/// Re-include files; an exception set left empty is removed
pub fn remove_sync_exception(
    graph: &mut ProjectGraph,
    folder: &str,
    target: &str,
    files: &[String],
) -> Result<Outcome> {
    let folder_id = graph.find_sync_folder(folder)?;
    let target_id = graph.find_target(target)?;
    let set = exception_set(graph, &folder_id, &target_id)?.ok_or_else(|| {
        GraphError::not_found(ObjectKind::ExceptionSet, format!("{} / {}", folder, target))
    })?;
    let entries = files
        .iter()
        .map(|f| folder_relative(graph, &folder_id, f))
        .collect::<Result<Vec<_>>>()?;

    let exceptions = &mut graph.objects.get_mut::<ExceptionSet>(&set)?.membership_exceptions;
    let before = exceptions.len();
    exceptions.retain(|e| !entries.contains(e));
    let removed = before - exceptions.len();
    let emptied = exceptions.is_empty();

    if emptied {
        purge(graph, &set)?;
    }
    if removed == 0 {
        return Ok(Outcome::unchanged(format!(
            "None of the given files are excluded from '{}' in '{}'",
            target, folder
        )));
    }
    tracing::info!("Re-included {} file(s) of {} in {}", removed, folder, target);
    Ok(Outcome::applied(format!(
        "Re-included {} file(s) of '{}' in '{}'{}",
        removed,
        folder,
        target,
        if emptied { " (exception set removed)" } else { "" }
    )))
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionEntry {
    pub target: String,
    pub files: Vec<String>,
}

/// Row of [`list_sync_folders`]
#[derive(Debug, Clone, Serialize)]
pub struct SyncFolderEntry {
    pub path: String,
    pub targets: Vec<String>,
    pub exceptions: Vec<ExceptionEntry>,
}

pub fn list_sync_folders(graph: &ProjectGraph) -> Result<Vec<SyncFolderEntry>> {
    let targets = graph.targets()?;
    let mut rows = Vec::new();
    for folder in graph.sync_folders() {
        let sync = graph.objects.get::<SyncGroup>(&folder)?;
        let members = targets
            .iter()
            .filter(|(_, t)| t.synchronized_groups.contains(&folder))
            .map(|(_, t)| t.name.clone())
            .collect();
        let mut exceptions = Vec::new();
        for set_id in &sync.exceptions {
            let set = graph.objects.get::<ExceptionSet>(set_id)?;
            exceptions.push(ExceptionEntry {
                target: graph.target(&set.target)?.name.clone(),
                files: set.membership_exceptions.clone(),
            });
        }
        rows.push(SyncFolderEntry {
            path: graph.full_path(&folder),
            targets: members,
            exceptions,
        });
    }
    Ok(rows)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn is_bundle(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| BUNDLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_excluded(relative: &str, exceptions: &[String]) -> bool {
    exceptions.iter().any(|e| {
        relative == e
            || relative
                .strip_prefix(e.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Files a target gets from synchronized folders, as `folder/relative`
/// paths in sorted order.
///
/// Covers the folders the target references plus folders whose exception
/// sets name it. Each folder is enumerated on disk; missing directories are
/// an I/O error.
pub fn target_effective_files(
    graph: &ProjectGraph,
    config: &SyncConfig,
    target: &str,
) -> Result<Vec<String>> {
    let target_id = graph.find_target(target)?;
    let mut folders: Vec<ObjectId> = graph.target(&target_id)?.synchronized_groups.clone();
    for folder in graph.sync_folders() {
        if !folders.contains(&folder) && exception_set(graph, &folder, &target_id)?.is_some() {
            folders.push(folder);
        }
    }

    let mut files = BTreeSet::new();
    for folder in &folders {
        let exceptions = match exception_set(graph, folder, &target_id)? {
            Some(set) => graph.objects.get::<ExceptionSet>(&set)?.membership_exceptions.clone(),
            None => Vec::new(),
        };
        let label = graph.full_path(folder);
        let root = graph.disk_path(folder);

        let mut walker = WalkDir::new(&root).min_depth(1).sort_by_file_name();
        if let Some(depth) = config.max_depth {
            walker = walker.max_depth(depth);
        }
        let mut entries = walker.into_iter().filter_entry(|entry| {
            !(config.ignore_hidden && is_hidden(&entry.file_name().to_string_lossy()))
        });

        while let Some(entry) = entries.next() {
            let entry = entry.map_err(std::io::Error::from)?;
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().is_dir();
            if is_dir && is_bundle(&name) {
                entries.skip_current_dir();
            } else if is_dir {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let relative = path_to_string(relative);
            if !is_excluded(&relative, &exceptions) {
                files.insert(format!("{}/{}", label, relative));
            }
        }
    }
    tracing::debug!("{} effective file(s) for {}", files.len(), target);
    Ok(files.into_iter().collect())
}
