//! File references: add, remove, move, list

use serde::Serialize;

use super::{attach_child, detach, phases, purge, staged, Outcome};
use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::path_utils::{file_name, project_relative};
use crate::types::{
    file_type_for_path, BuildFile, BuildPhase, FileReference, Group, ObjectId, ObjectKind,
    SourceTree,
};

/// File reference whose project-relative location is exactly `relative`
fn existing_reference(graph: &ProjectGraph, relative: &str) -> Option<ObjectId> {
    graph
        .objects
        .iter::<FileReference>()
        .find(|(id, _)| graph.full_path(id) == relative)
        .map(|(id, _)| id.clone())
}

/// Add a file to the project under `group` (the main group when unset),
/// optionally adding it to a target's build phases as well.
pub fn add_file(
    graph: &mut ProjectGraph,
    path: &str,
    group: Option<&str>,
    target: Option<&str>,
) -> Result<Outcome> {
    let relative = project_relative(graph.source_root(), path);
    if relative.is_empty() || relative.ends_with('/') {
        return Err(GraphError::InvalidArgument(format!("'{}' is not a file path", path)));
    }
    let group_id = graph.find_group_or_main(group)?;
    let target_id = target.map(|name| graph.find_target(name)).transpose()?;

    staged(graph, |graph| {
        let mut outcomes = Vec::new();
        let file = match existing_reference(graph, &relative) {
            Some(id) => {
                tracing::debug!("{} already referenced", relative);
                outcomes.push(Outcome::unchanged(format!("'{}' is already in the project", relative)));
                id
            }
            None => {
                let id = graph.objects.insert(FileReference {
                    name: Some(file_name(&relative).to_string()),
                    path: relative.clone(),
                    source_tree: SourceTree::SourceRoot,
                    last_known_file_type: Some(file_type_for_path(&relative).to_string()),
                    explicit_file_type: None,
                });
                attach_child(graph, &group_id, id.clone())?;
                tracing::info!("Added file {}", relative);
                outcomes.push(Outcome::applied(format!(
                    "Added '{}' to group '{}'",
                    relative,
                    group.unwrap_or("<main>")
                )));
                id
            }
        };
        if let Some(target_id) = &target_id {
            outcomes.push(phases::add_file_to_target(graph, &file, target_id)?);
        }
        Ok(Outcome::merge(outcomes))
    })
}

/// Remove a file reference together with every build file pointing at it
pub fn remove_file(graph: &mut ProjectGraph, path: &str) -> Result<Outcome> {
    let id = graph.find_file_reference(path)?;
    let display_name = graph.full_path(&id);
    let build_files = graph.build_files_for(&id).len();
    purge(graph, &id)?;
    tracing::info!("Removed file {} ({} build files)", display_name, build_files);
    Ok(Outcome::applied(format!(
        "Removed '{}' and {} build file(s) referencing it",
        display_name, build_files
    )))
}

/// Move a file to another group and/or a new project-relative path
pub fn move_file(
    graph: &mut ProjectGraph,
    path: &str,
    to_group: Option<&str>,
    new_path: Option<&str>,
) -> Result<Outcome> {
    if to_group.is_none() && new_path.is_none() {
        return Err(GraphError::InvalidArgument(
            "Moving a file needs a destination group or a new path".to_string(),
        ));
    }
    let id = graph.find_file_reference(path)?;
    let destination = to_group.map(|g| graph.find_group(g)).transpose()?;
    let new_relative = new_path.map(|p| project_relative(graph.source_root(), p));
    if let Some(relative) = &new_relative {
        if let Some(other) = existing_reference(graph, relative).filter(|other| *other != id) {
            return Err(GraphError::already_exists(
                ObjectKind::FileReference,
                format!("{} ({})", relative, other),
            ));
        }
    }

    staged(graph, |graph| {
        let mut changes = Vec::new();
        if let Some(destination) = destination {
            if graph.parent_group(&id).as_ref() != Some(&destination) {
                detach(graph, &id)?;
                attach_child(graph, &destination, id.clone())?;
                let label = graph.objects.get::<Group>(&destination)?.display_name().to_string();
                changes.push(format!("moved to group '{}'", label));
            }
        }
        if let Some(relative) = new_relative {
            let file = graph.objects.get_mut::<FileReference>(&id)?;
            if file.path != relative || file.source_tree != SourceTree::SourceRoot {
                file.path = relative.clone();
                file.source_tree = SourceTree::SourceRoot;
                file.name = Some(file_name(&relative).to_string());
                file.last_known_file_type = Some(file_type_for_path(&relative).to_string());
                changes.push(format!("path is now '{}'", relative));
            }
        }

        if changes.is_empty() {
            return Ok(Outcome::unchanged(format!("'{}' is already there", path)));
        }
        tracing::info!("Moved file {}: {}", path, changes.join(", "));
        Ok(Outcome::applied(format!("'{}' {}", path, changes.join(", "))))
    })
}

/// Row of [`list_files`]
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    pub file_type: Option<String>,
    /// `Target/Phase` memberships
    pub phases: Vec<String>,
}

/// Every file reference in the group tree (products excluded). With a
/// target, only files that are in one of its build phases.
pub fn list_files(graph: &ProjectGraph, target: Option<&str>) -> Result<Vec<FileEntry>> {
    let target_filter = target.map(|name| graph.find_target(name)).transpose()?;
    let products = graph.products_group()?;
    let product_ids: Vec<ObjectId> = graph.objects.get::<Group>(&products)?.children.clone();

    // file id -> memberships
    let mut memberships: Vec<(ObjectId, String)> = Vec::new();
    for (target_id, target) in graph.targets()? {
        if target_filter.as_ref().is_some_and(|only| *only != target_id) {
            continue;
        }
        for phase_id in &target.build_phases {
            let phase = graph.objects.get::<BuildPhase>(phase_id)?;
            for build_file in &phase.files {
                if let Some(file) = graph
                    .objects
                    .get::<BuildFile>(build_file)
                    .ok()
                    .and_then(|bf| bf.file_ref.clone())
                {
                    memberships.push((file, format!("{}/{}", target.name, phase.display_name())));
                }
            }
        }
    }

    let mut rows = Vec::new();
    for (id, file) in graph.objects.iter::<FileReference>() {
        if product_ids.contains(id) {
            continue;
        }
        let phases: Vec<String> = memberships
            .iter()
            .filter(|(file_id, _)| file_id == id)
            .map(|(_, label)| label.clone())
            .collect();
        if target_filter.is_some() && phases.is_empty() {
            continue;
        }
        rows.push(FileEntry {
            path: graph.full_path(id),
            name: file.display_name().to_string(),
            file_type: file
                .last_known_file_type
                .clone()
                .or_else(|| file.explicit_file_type.clone()),
            phases,
        });
    }
    rows.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::project_with;
    use crate::ops::groups::create_group;
    use crate::types::PhaseVariant;

    #[test]
    fn test_add_file_to_group_and_target() {
        let mut graph = project_with(&["App"]);
        create_group(&mut graph, "Models", None, None).unwrap();
        let outcome = add_file(&mut graph, "Models/User.swift", Some("Models"), Some("App")).unwrap();
        assert!(outcome.is_applied());
        graph.validate().unwrap();

        let id = graph.find_file_reference("Models/User.swift").unwrap();
        let models = graph.find_group("Models").unwrap();
        assert_eq!(graph.parent_group(&id), Some(models));
        let file = graph.objects.get::<FileReference>(&id).unwrap();
        assert_eq!(file.last_known_file_type.as_deref(), Some("sourcecode.swift"));

        let app = graph.find_target("App").unwrap();
        let sources = graph.find_phase(&app, PhaseVariant::Sources).unwrap().unwrap();
        assert_eq!(graph.objects.get::<BuildPhase>(&sources).unwrap().files.len(), 1);

        // Adding again changes nothing
        assert!(!add_file(&mut graph, "/work/Demo/Models/User.swift", Some("Models"), Some("App"))
            .unwrap()
            .is_applied());
    }

    #[test]
    fn test_add_file_unknown_group_names_component() {
        let mut graph = project_with(&[]);
        match add_file(&mut graph, "A.swift", Some("Sources/Missing"), None) {
            Err(GraphError::GroupPathNotFound { component, .. }) => assert_eq!(component, "Sources"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_remove_file_drops_build_files_everywhere() {
        let mut graph = project_with(&["App", "Tests"]);
        add_file(&mut graph, "Shared/Log.swift", None, Some("App")).unwrap();
        add_file(&mut graph, "Shared/Log.swift", None, Some("Tests")).unwrap();
        let id = graph.find_file_reference("Log.swift").unwrap();
        assert_eq!(graph.build_files_for(&id).len(), 2);

        let outcome = remove_file(&mut graph, "Log.swift").unwrap();
        assert!(outcome.message().contains("2 build file(s)"));
        assert!(graph.objects.iter::<BuildFile>().next().is_none());
        for (_, phase) in graph.objects.iter::<BuildPhase>() {
            assert!(phase.files.iter().all(|bf| graph.objects.contains(bf)));
        }
        graph.validate().unwrap();
        assert!(matches!(
            remove_file(&mut graph, "Log.swift"),
            Err(GraphError::NotFound { .. })
        ));
    }

    #[test]
    fn test_move_file() {
        let mut graph = project_with(&["App"]);
        create_group(&mut graph, "Models", None, None).unwrap();
        add_file(&mut graph, "User.swift", None, Some("App")).unwrap();

        move_file(&mut graph, "User.swift", Some("Models"), Some("Models/User.swift")).unwrap();
        let id = graph.find_file_reference("Models/User.swift").unwrap();
        assert_eq!(graph.parent_group(&id), Some(graph.find_group("Models").unwrap()));
        // Build file membership survives the move
        assert_eq!(graph.build_files_for(&id).len(), 1);

        assert!(!move_file(&mut graph, "Models/User.swift", Some("Models"), None)
            .unwrap()
            .is_applied());
        assert!(matches!(
            move_file(&mut graph, "Models/User.swift", None, None),
            Err(GraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_list_files() {
        let mut graph = project_with(&["App", "Tests"]);
        add_file(&mut graph, "App/main.swift", None, Some("App")).unwrap();
        add_file(&mut graph, "Tests/AppTests.swift", None, Some("Tests")).unwrap();
        add_file(&mut graph, "README.md", None, None).unwrap();

        let all = list_files(&graph, None).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|f| !f.path.ends_with(".app")));

        let app = list_files(&graph, Some("App")).unwrap();
        assert_eq!(app.len(), 1);
        assert_eq!(app[0].path, "App/main.swift");
        assert_eq!(app[0].phases, vec!["App/Sources".to_string()]);
    }
}
