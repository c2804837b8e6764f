//! Graph mutation operations
//!
//! Every operation takes the graph explicitly, resolves what it needs through
//! the resolver and leaves the graph satisfying every invariant checked by
//! [`ProjectGraph::validate`]. Multi-step operations run on a staged copy and
//! commit only when every step succeeded.

pub mod dependencies;
pub mod files;
pub mod frameworks;
pub mod groups;
pub mod packages;
pub mod phases;
pub mod settings;
pub mod sync_folder;
pub mod targets;

use std::collections::HashSet;

use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::types::{Group, ObjectId, ObjectKind};

/// Result of a mutation that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The graph changed and must be persisted
    Applied(String),
    /// Nothing to do (duplicate add, already a member, ...)
    Unchanged(String),
}

impl Outcome {
    pub fn applied(message: impl Into<String>) -> Self {
        Outcome::Applied(message.into())
    }

    pub fn unchanged(message: impl Into<String>) -> Self {
        Outcome::Unchanged(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Applied(message) | Outcome::Unchanged(message) => message,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    /// Fold several outcomes into one, applied if any of them was
    pub fn merge(outcomes: Vec<Outcome>) -> Outcome {
        let applied = outcomes.iter().any(Outcome::is_applied);
        let message = outcomes
            .iter()
            .map(Outcome::message)
            .collect::<Vec<_>>()
            .join("\n");
        if applied {
            Outcome::Applied(message)
        } else {
            Outcome::Unchanged(message)
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Anything a transaction closure can return: tells the workspace whether the
/// graph has to be written back.
pub trait Mutation {
    fn is_applied(&self) -> bool;
}

impl Mutation for Outcome {
    fn is_applied(&self) -> bool {
        Outcome::is_applied(self)
    }
}

impl<T> Mutation for (Outcome, T) {
    fn is_applied(&self) -> bool {
        self.0.is_applied()
    }
}

/// Run `f` against a copy of the graph and swap it in only on success
pub(crate) fn staged<T>(
    graph: &mut ProjectGraph,
    f: impl FnOnce(&mut ProjectGraph) -> Result<T>,
) -> Result<T> {
    let mut draft = graph.clone();
    let value = f(&mut draft)?;
    *graph = draft;
    Ok(value)
}

/// Remove `root` with everything it owns and strip every link into that
/// subtree. Records that exist only to point at a removed entity (build files,
/// dependency edges and their proxies, exception sets, package products) go
/// with it. Returns the number of removed objects.
pub(crate) fn purge(graph: &mut ProjectGraph, root: &ObjectId) -> Result<usize> {
    let members: HashSet<ObjectId> = graph.objects.subtree_ids(root).into_iter().collect();
    if members.is_empty() {
        return Err(GraphError::InvalidArgument(format!("no object with id {}", root)));
    }

    let mut dependents: Vec<ObjectId> = Vec::new();
    let mut links: Vec<(ObjectId, ObjectId)> = Vec::new();
    for member in &members {
        for referrer in graph.objects.referrers(member) {
            if members.contains(&referrer) {
                continue;
            }
            match graph.kind_of(&referrer) {
                Some(
                    ObjectKind::BuildFile
                    | ObjectKind::Dependency
                    | ObjectKind::ExceptionSet
                    | ObjectKind::PackageProduct,
                ) => dependents.push(referrer),
                Some(ObjectKind::ContainerItemProxy) => {
                    if let Some(owner) = graph.objects.owner_of(&referrer) {
                        dependents.push(owner);
                    }
                }
                _ => links.push((referrer, member.clone())),
            }
        }
    }
    dependents.sort();
    dependents.dedup();

    let mut removed = 0;
    for dependent in dependents {
        if graph.objects.contains(&dependent) && !members.contains(&dependent) {
            removed += purge(graph, &dependent)?;
        }
    }
    for (referrer, member) in links {
        if let Some(object) = graph.objects.object_mut(&referrer) {
            object.unlink(&member);
        }
    }

    removed += graph.objects.remove_subtree(root)?.len();
    Ok(removed)
}

/// Append a child to a group. Under the main group new children go before the
/// Products group so it stays last.
pub(crate) fn attach_child(
    graph: &mut ProjectGraph,
    parent: &ObjectId,
    child: ObjectId,
) -> Result<()> {
    let main = graph.main_group()?;
    let products = graph.products_group()?;
    let group = graph.objects.get_mut::<Group>(parent)?;
    match group.children.iter().position(|c| *c == products) {
        Some(index) if *parent == main => group.children.insert(index, child),
        _ => group.children.push(child),
    }
    Ok(())
}

/// Detach a node from whatever owns it
pub(crate) fn detach(graph: &mut ProjectGraph, id: &ObjectId) -> Result<()> {
    if let Some(owner) = graph.objects.owner_of(id) {
        if let Some(object) = graph.objects.object_mut(&owner) {
            object.unlink(id);
        }
    }
    Ok(())
}

/// Reject names that cannot be used as a target or group name
pub(crate) fn check_name(kind: ObjectKind, name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GraphError::InvalidArgument(format!("{} name must not be empty", kind)));
    }
    if trimmed != name || name.contains('/') {
        return Err(GraphError::InvalidArgument(format!(
            "Invalid {} name '{}': no surrounding whitespace or '/' allowed",
            kind.to_string().to_lowercase(),
            name
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuildFile, BuildPhase, FileReference, PhaseKind, SourceTree, Target};

    #[test]
    fn test_outcome_merge() {
        let merged = Outcome::merge(vec![
            Outcome::unchanged("already there"),
            Outcome::applied("added"),
        ]);
        assert!(merged.is_applied());
        assert_eq!(merged.message(), "already there\nadded");
        assert!(!Outcome::merge(vec![Outcome::unchanged("a")]).is_applied());
    }

    #[test]
    fn test_staged_discards_failed_changes() {
        let mut graph = fixtures::project_with(&["App"]);
        let before = graph.clone();
        let result: Result<()> = staged(&mut graph, |draft| {
            draft.project_mut()?.name = "Changed".into();
            Err(GraphError::Validation("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(graph, before);
    }

    #[test]
    fn test_purge_file_removes_build_files() {
        let mut graph = fixtures::project_with(&["App"]);
        let main = graph.main_group().unwrap();
        let file = graph.objects.insert(FileReference {
            name: Some("User.swift".into()),
            path: "User.swift".into(),
            source_tree: SourceTree::Group,
            last_known_file_type: None,
            explicit_file_type: None,
        });
        attach_child(&mut graph, &main, file.clone()).unwrap();
        let build_file = graph.objects.insert(BuildFile::for_file(file.clone()));
        let mut phase = BuildPhase::new(PhaseKind::Headers);
        phase.files.push(build_file.clone());
        let phase_id = graph.objects.insert(phase);
        let app = graph.find_target("App").unwrap();
        graph
            .objects
            .get_mut::<Target>(&app)
            .unwrap()
            .build_phases
            .push(phase_id.clone());

        let removed = purge(&mut graph, &file).unwrap();
        assert_eq!(removed, 2);
        assert!(graph.objects.get::<BuildPhase>(&phase_id).unwrap().files.is_empty());
        assert!(!graph.objects.get::<Group>(&main).unwrap().children.contains(&file));
        graph.validate().unwrap();
    }

    #[test]
    fn test_attach_child_keeps_products_last() {
        let mut graph = ProjectGraph::new("Demo");
        let main = graph.main_group().unwrap();
        let products = graph.products_group().unwrap();
        let models = graph.objects.insert(Group::named("Models"));
        attach_child(&mut graph, &main, models.clone()).unwrap();
        assert_eq!(
            graph.objects.get::<Group>(&main).unwrap().children,
            vec![models, products]
        );
    }

    #[test]
    fn test_check_name() {
        assert!(check_name(ObjectKind::Target, "App").is_ok());
        assert!(check_name(ObjectKind::Target, "").is_err());
        assert!(check_name(ObjectKind::Group, "a/b").is_err());
        assert!(check_name(ObjectKind::Group, " App").is_err());
    }
}
