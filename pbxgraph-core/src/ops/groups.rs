//! Navigator groups: create, rename, remove, list

use serde::Serialize;

use super::{attach_child, check_name, purge, staged, Outcome};
use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::types::{Group, Object, ObjectId, ObjectKind};

/// Create a group under `parent` (the main group when unset).
///
/// `path` defaults to the group name. An existing child with that name is
/// reported, not duplicated.
pub fn create_group(
    graph: &mut ProjectGraph,
    name: &str,
    parent: Option<&str>,
    path: Option<&str>,
) -> Result<Outcome> {
    check_name(ObjectKind::Group, name)?;
    let parent_id = graph.find_group_or_main(parent)?;
    if graph.child_group(&parent_id, name).is_some() {
        return Ok(Outcome::unchanged(format!("Group '{}' already exists", name)));
    }

    let group = graph.objects.insert(Group {
        name: Some(name.to_string()),
        path: Some(path.unwrap_or(name).to_string()),
        ..Default::default()
    });
    attach_child(graph, &parent_id, group)?;
    tracing::info!("Created group {} under {}", name, parent.unwrap_or("<main>"));
    Ok(Outcome::applied(format!(
        "Created group '{}' in '{}'",
        name,
        parent.unwrap_or("<main>")
    )))
}

fn check_removable(graph: &ProjectGraph, id: &ObjectId, path: &str) -> Result<()> {
    if *id == graph.main_group()? || *id == graph.products_group()? {
        return Err(GraphError::InvalidArgument(format!(
            "'{}' is a built-in group and cannot be changed",
            path
        )));
    }
    Ok(())
}

/// Rename the group at `path`. Its `path` follows the name when the two
/// were the same.
pub fn rename_group(graph: &mut ProjectGraph, path: &str, new_name: &str) -> Result<Outcome> {
    check_name(ObjectKind::Group, new_name)?;
    let id = graph.find_group(path)?;
    check_removable(graph, &id, path)?;

    let old = graph.objects.get::<Group>(&id)?.display_name().to_string();
    if old == new_name {
        return Ok(Outcome::unchanged(format!("Group is already named '{}'", new_name)));
    }
    if let Some(parent) = graph.parent_group(&id) {
        if graph.child_group(&parent, new_name).is_some_and(|sibling| sibling != id) {
            return Err(GraphError::already_exists(ObjectKind::Group, new_name));
        }
    }

    let group = graph.objects.get_mut::<Group>(&id)?;
    if group.path.as_deref() == Some(old.as_str()) {
        group.path = Some(new_name.to_string());
    }
    group.name = Some(new_name.to_string());
    tracing::info!("Renamed group {} -> {}", path, new_name);
    Ok(Outcome::applied(format!("Renamed group '{}' to '{}'", path, new_name)))
}

/// Remove a group. A group with children is only removed when `recursive`
/// is set, and then its files and their build files go with it.
pub fn remove_group(graph: &mut ProjectGraph, path: &str, recursive: bool) -> Result<Outcome> {
    let id = graph.find_group(path)?;
    check_removable(graph, &id, path)?;

    let children = graph.objects.get::<Group>(&id)?.children.len();
    if children > 0 && !recursive {
        return Err(GraphError::Validation(format!(
            "Group '{}' has {} child item(s); remove them first or pass recursive",
            path, children
        )));
    }

    staged(graph, |graph| {
        let removed = purge(graph, &id)?;
        tracing::info!("Removed group {} ({} objects)", path, removed);
        Ok(Outcome::applied(format!(
            "Removed group '{}' ({} object(s))",
            path, removed
        )))
    })
}

/// Row of [`list_groups`]
#[derive(Debug, Clone, Serialize)]
pub struct GroupEntry {
    /// Slash-separated path of display names from the main group
    pub path: String,
    pub depth: usize,
    pub synchronized: bool,
    pub children: usize,
}

/// Depth-first listing of the group tree below the main group
pub fn list_groups(graph: &ProjectGraph) -> Result<Vec<GroupEntry>> {
    let main = graph.main_group()?;
    let mut rows = Vec::new();
    let mut stack: Vec<(ObjectId, String, usize)> = graph
        .objects
        .get::<Group>(&main)?
        .children
        .iter()
        .rev()
        .map(|id| (id.clone(), String::new(), 0))
        .collect();

    while let Some((id, prefix, depth)) = stack.pop() {
        let (label, children, synchronized) = match graph.objects.object(&id) {
            Some(Object::Group(group)) => (group.display_name().to_string(), Some(&group.children), false),
            Some(Object::SyncGroup(sync)) => (sync.name.clone().unwrap_or_else(|| sync.path.clone()), None, true),
            _ => continue,
        };
        let path = if prefix.is_empty() {
            label
        } else {
            format!("{}/{}", prefix, label)
        };
        rows.push(GroupEntry {
            path: path.clone(),
            depth,
            synchronized,
            children: children.map(Vec::len).unwrap_or(0),
        });
        if let Some(children) = children {
            for child in children.iter().rev() {
                stack.push((child.clone(), path.clone(), depth + 1));
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::files::add_file;
    use crate::ops::fixtures::project_with;
    use crate::types::{BuildFile, FileReference};

    #[test]
    fn test_create_nested_groups() {
        let mut graph = project_with(&[]);
        create_group(&mut graph, "Sources", None, None).unwrap();
        create_group(&mut graph, "Models", Some("Sources"), None).unwrap();
        assert!(graph.find_group("Sources/Models").is_ok());
        assert!(!create_group(&mut graph, "Models", Some("Sources"), None)
            .unwrap()
            .is_applied());
        match create_group(&mut graph, "Deep", Some("Sources/Nope"), None) {
            Err(GraphError::GroupPathNotFound { component, .. }) => assert_eq!(component, "Nope"),
            other => panic!("unexpected: {:?}", other),
        }
        graph.validate().unwrap();
    }

    #[test]
    fn test_models_group_scenario() {
        let mut graph = project_with(&["App"]);
        create_group(&mut graph, "Models", None, None).unwrap();
        add_file(&mut graph, "Models/User.swift", Some("Models"), Some("App")).unwrap();

        assert!(matches!(
            remove_group(&mut graph, "Models", false),
            Err(GraphError::Validation(_))
        ));
        assert!(graph.find_file_reference("Models/User.swift").is_ok());

        remove_group(&mut graph, "Models", true).unwrap();
        assert!(graph.find_group("Models").is_err());
        assert!(graph.find_file_reference("Models/User.swift").is_err());
        assert!(graph
            .objects
            .iter::<FileReference>()
            .all(|(_, f)| f.path != "Models/User.swift"));
        assert!(graph.objects.iter::<BuildFile>().next().is_none());
        graph.validate().unwrap();
    }

    #[test]
    fn test_rename_group() {
        let mut graph = project_with(&[]);
        create_group(&mut graph, "Models", None, None).unwrap();
        create_group(&mut graph, "Views", None, None).unwrap();
        assert!(matches!(
            rename_group(&mut graph, "Models", "Views"),
            Err(GraphError::AlreadyExists { .. })
        ));
        rename_group(&mut graph, "Models", "Entities").unwrap();
        let id = graph.find_group("Entities").unwrap();
        assert_eq!(graph.objects.get::<Group>(&id).unwrap().path.as_deref(), Some("Entities"));
        assert!(matches!(
            rename_group(&mut graph, "", "Root"),
            Err(GraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_builtin_groups_cannot_be_removed() {
        let mut graph = project_with(&["App"]);
        assert!(matches!(
            remove_group(&mut graph, "Products", true),
            Err(GraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_list_groups() {
        let mut graph = project_with(&["App"]);
        create_group(&mut graph, "Models", Some("App"), None).unwrap();
        let rows = list_groups(&graph).unwrap();
        let paths: Vec<&str> = rows.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["App", "App/Models", "Products"]);
        assert_eq!(rows[1].depth, 1);
        assert_eq!(rows[2].children, 1);
    }
}
