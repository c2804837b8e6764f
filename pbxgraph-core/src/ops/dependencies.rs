//! Dependency edges between targets

use std::collections::HashSet;

use super::{purge, Outcome};
use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::types::{ContainerItemProxy, Dependency, ObjectId, ObjectKind, ProxyType, Target};

/// Edge of `from` pointing at `to`, if any
fn find_edge(graph: &ProjectGraph, from: &ObjectId, to: &ObjectId) -> Result<Option<ObjectId>> {
    Ok(graph
        .target(from)?
        .dependencies
        .iter()
        .find(|id| {
            graph
                .objects
                .get::<Dependency>(id)
                .map(|dep| &dep.target == to)
                .unwrap_or(false)
        })
        .cloned())
}

/// Path of target names from `start` to `goal` following dependency edges
fn dependency_path(graph: &ProjectGraph, start: &ObjectId, goal: &ObjectId) -> Option<Vec<ObjectId>> {
    let mut visited = HashSet::new();
    let mut stack = vec![vec![start.clone()]];
    while let Some(path) = stack.pop() {
        let Some(current) = path.last() else {
            continue;
        };
        if current == goal {
            return Some(path);
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        let Ok(target) = graph.target(current) else {
            continue;
        };
        for edge in &target.dependencies {
            if let Ok(dep) = graph.objects.get::<Dependency>(edge) {
                let mut next = path.clone();
                next.push(dep.target.clone());
                stack.push(next);
            }
        }
    }
    None
}

/// Make `from` depend on `to`.
///
/// Self-dependencies and edges that would close a cycle are rejected; an
/// existing edge is left alone.
pub fn add_dependency(graph: &mut ProjectGraph, from: &str, to: &str) -> Result<Outcome> {
    if from == to {
        return Err(GraphError::Validation(format!(
            "Target '{}' cannot depend on itself",
            from
        )));
    }
    let from_id = graph.find_target(from)?;
    let to_id = graph.find_target(to)?;

    if find_edge(graph, &from_id, &to_id)?.is_some() {
        tracing::debug!("Dependency {} -> {} already present", from, to);
        return Ok(Outcome::unchanged(format!(
            "Target '{}' already depends on '{}'",
            from, to
        )));
    }

    if let Some(path) = dependency_path(graph, &to_id, &from_id) {
        let names: Vec<String> = path
            .iter()
            .filter_map(|id| graph.target(id).ok().map(|t| t.name.clone()))
            .collect();
        return Err(GraphError::Validation(format!(
            "Adding {} -> {} would create a dependency cycle ({} -> {})",
            from,
            to,
            names.join(" -> "),
            to
        )));
    }

    let root = graph.root_object.clone();
    let target_proxy = graph.objects.insert(ContainerItemProxy {
        container_portal: root,
        proxy_type: ProxyType::NativeTarget,
        remote_global_id: to_id.clone(),
        remote_info: to.to_string(),
    });
    let edge = graph.objects.insert(Dependency {
        name: to.to_string(),
        target: to_id,
        target_proxy,
    });
    graph
        .objects
        .get_mut::<Target>(&from_id)?
        .dependencies
        .push(edge);

    tracing::info!("Added dependency {} -> {}", from, to);
    Ok(Outcome::applied(format!("Target '{}' now depends on '{}'", from, to)))
}

pub fn remove_dependency(graph: &mut ProjectGraph, from: &str, to: &str) -> Result<Outcome> {
    let from_id = graph.find_target(from)?;
    let to_id = graph.find_target(to)?;
    let edge = find_edge(graph, &from_id, &to_id)?.ok_or_else(|| {
        GraphError::not_found(ObjectKind::Dependency, format!("{} -> {}", from, to))
    })?;
    purge(graph, &edge)?;
    tracing::info!("Removed dependency {} -> {}", from, to);
    Ok(Outcome::applied(format!(
        "Target '{}' no longer depends on '{}'",
        from, to
    )))
}

/// Drop every dependency edge (and its proxy) pointing at `target`, wherever
/// it is held. Returns the number of edges removed; calling it again removes
/// nothing.
pub fn remove_dependencies_targeting(graph: &mut ProjectGraph, target: &ObjectId) -> Result<usize> {
    let mut edges: Vec<ObjectId> = graph
        .objects
        .iter::<Dependency>()
        .filter(|(_, dep)| &dep.target == target)
        .map(|(id, _)| id.clone())
        .collect();
    // Proxies naming the target behind an edge that points elsewhere
    for (proxy, _) in graph
        .objects
        .iter::<ContainerItemProxy>()
        .filter(|(_, proxy)| &proxy.remote_global_id == target)
    {
        if let Some(owner) = graph.objects.owner_of(proxy) {
            if !edges.contains(&owner) {
                edges.push(owner);
            }
        }
    }

    for edge in &edges {
        if graph.objects.contains(edge) {
            purge(graph, edge)?;
        }
    }
    Ok(edges.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::project_with;
    use crate::config::EngineConfig;
    use crate::ops::targets::{create_target, remove_target, TargetSpec};
    use crate::types::ProductType;

    fn edge_count(graph: &ProjectGraph, from: &str) -> usize {
        let id = graph.find_target(from).unwrap();
        graph.target(&id).unwrap().dependencies.len()
    }

    #[test]
    fn test_self_dependency_is_rejected() {
        let mut graph = project_with(&["App"]);
        assert!(matches!(
            add_dependency(&mut graph, "App", "App"),
            Err(GraphError::Validation(_))
        ));
        assert_eq!(edge_count(&graph, "App"), 0);
    }

    #[test]
    fn test_duplicate_edge_is_a_no_op() {
        let mut graph = project_with(&["App", "Kit"]);
        assert!(add_dependency(&mut graph, "App", "Kit").unwrap().is_applied());
        let again = add_dependency(&mut graph, "App", "Kit").unwrap();
        assert!(!again.is_applied());
        assert!(again.message().contains("already depends"));
        assert_eq!(edge_count(&graph, "App"), 1);
        graph.validate().unwrap();
    }

    #[test]
    fn test_longer_cycle_is_rejected() {
        let mut graph = project_with(&["A", "B", "C"]);
        add_dependency(&mut graph, "A", "B").unwrap();
        add_dependency(&mut graph, "B", "C").unwrap();
        let err = add_dependency(&mut graph, "C", "A").unwrap_err();
        match err {
            GraphError::Validation(msg) => assert!(msg.contains("A -> B -> C")),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(edge_count(&graph, "C"), 0);
    }

    #[test]
    fn test_app_widget_scenario() {
        let mut graph = project_with(&["App"]);
        let spec = TargetSpec::new("Widget", ProductType::AppExtension);
        create_target(&mut graph, &EngineConfig::default(), &spec).unwrap();
        add_dependency(&mut graph, "App", "Widget").unwrap();
        let widget = graph.find_target("Widget").unwrap();

        remove_target(&mut graph, "Widget").unwrap();
        assert_eq!(edge_count(&graph, "App"), 0);
        assert!(graph
            .objects
            .iter::<ContainerItemProxy>()
            .all(|(_, proxy)| proxy.remote_global_id != widget));
        graph.validate().unwrap();
    }

    #[test]
    fn test_remove_dependency() {
        let mut graph = project_with(&["App", "Kit"]);
        add_dependency(&mut graph, "App", "Kit").unwrap();
        remove_dependency(&mut graph, "App", "Kit").unwrap();
        assert_eq!(edge_count(&graph, "App"), 0);
        assert_eq!(graph.objects.iter::<ContainerItemProxy>().count(), 0);
        assert!(matches!(
            remove_dependency(&mut graph, "App", "Kit"),
            Err(GraphError::NotFound { kind: ObjectKind::Dependency, .. })
        ));
    }

    #[test]
    fn test_remove_dependencies_targeting_is_idempotent() {
        let mut graph = project_with(&["App", "Tests", "Kit"]);
        add_dependency(&mut graph, "App", "Kit").unwrap();
        add_dependency(&mut graph, "Tests", "Kit").unwrap();
        let kit = graph.find_target("Kit").unwrap();
        assert_eq!(remove_dependencies_targeting(&mut graph, &kit).unwrap(), 2);
        assert_eq!(remove_dependencies_targeting(&mut graph, &kit).unwrap(), 0);
        graph.validate().unwrap();
    }
}
