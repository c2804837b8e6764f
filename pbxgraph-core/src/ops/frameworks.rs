//! Linking and embedding frameworks

use super::phases::{add_copy_files_phase, attach_build_file, copy_attributes, ensure_phase};
use super::{attach_child, staged, Outcome};
use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::path_utils::{file_name, project_relative};
use crate::types::{
    BuildFile, CopyDestination, FileReference, Group, ObjectId, PhaseVariant, SourceTree,
};

const EMBED_PHASE_NAME: &str = "Embed Frameworks";
const FRAMEWORKS_GROUP: &str = "Frameworks";

/// A framework named by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameworkSource {
    /// SDK framework such as `UIKit`
    System(String),
    /// Project-relative bundle such as `Vendor/Foo.xcframework`
    Custom(String),
}

impl FrameworkSource {
    /// A name with a path separator or a `.framework` suffix is a custom
    /// framework; anything else comes from the SDK.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name.contains('/') || name.ends_with(".framework") || name.ends_with(".xcframework") {
            FrameworkSource::Custom(name.to_string())
        } else {
            FrameworkSource::System(name.to_string())
        }
    }

    fn reference(&self, root: &std::path::Path) -> FileReference {
        match self {
            FrameworkSource::System(name) => {
                let bundle = format!("{}.framework", name);
                FileReference {
                    name: Some(bundle.clone()),
                    path: format!("System/Library/Frameworks/{}", bundle),
                    source_tree: SourceTree::SdkRoot,
                    last_known_file_type: Some("wrapper.framework".to_string()),
                    explicit_file_type: None,
                }
            }
            FrameworkSource::Custom(path) => {
                let relative = project_relative(root, path);
                let file_type = if relative.ends_with(".xcframework") {
                    "wrapper.xcframework"
                } else {
                    "wrapper.framework"
                };
                FileReference {
                    name: Some(file_name(&relative).to_string()),
                    path: relative,
                    source_tree: SourceTree::SourceRoot,
                    last_known_file_type: Some(file_type.to_string()),
                    explicit_file_type: None,
                }
            }
        }
    }
}

/// Reuse a reference with the same anchor and path
fn existing_framework(graph: &ProjectGraph, wanted: &FileReference) -> Option<ObjectId> {
    graph
        .objects
        .iter::<FileReference>()
        .find(|(_, file)| file.source_tree == wanted.source_tree && file.path == wanted.path)
        .map(|(id, _)| id.clone())
}

/// "Frameworks" group under the main group, created on first use
fn frameworks_group(graph: &mut ProjectGraph) -> Result<ObjectId> {
    let main = graph.main_group()?;
    if let Some(id) = graph.child_group(&main, FRAMEWORKS_GROUP) {
        return Ok(id);
    }
    let id = graph.objects.insert(Group::named(FRAMEWORKS_GROUP));
    attach_child(graph, &main, id.clone())?;
    Ok(id)
}

/// Link a framework into a target, optionally embedding it.
///
/// Embedding copies the framework into the product's Frameworks folder with
/// code-sign-on-copy; SDK frameworks ship with the OS and cannot be embedded.
pub fn add_framework(
    graph: &mut ProjectGraph,
    target: &str,
    framework: &str,
    embed: bool,
) -> Result<Outcome> {
    if framework.trim().is_empty() {
        return Err(GraphError::InvalidArgument("Framework name must not be empty".to_string()));
    }
    let source = FrameworkSource::parse(framework);
    if embed && matches!(source, FrameworkSource::System(_)) {
        return Err(GraphError::InvalidArgument(format!(
            "'{}' is a system framework and cannot be embedded",
            framework
        )));
    }
    let target_id = graph.find_target(target)?;
    let wanted = source.reference(graph.source_root());
    let label = wanted.display_name().to_string();

    staged(graph, |graph| {
        let mut outcomes = Vec::new();
        let file = match existing_framework(graph, &wanted) {
            Some(id) => id,
            None => {
                let group = frameworks_group(graph)?;
                let id = graph.objects.insert(wanted);
                attach_child(graph, &group, id.clone())?;
                id
            }
        };

        let phase = ensure_phase(graph, &target_id, PhaseVariant::Frameworks)?;
        if attach_build_file(graph, &phase, BuildFile::for_file(file.clone()))? {
            tracing::info!("Linked {} into {}", label, target);
            outcomes.push(Outcome::applied(format!("Linked '{}' into '{}'", label, target)));
        } else {
            outcomes.push(Outcome::unchanged(format!(
                "'{}' is already linked into '{}'",
                label, target
            )));
        }

        if embed {
            let destination = CopyDestination::Frameworks;
            let created =
                add_copy_files_phase(graph, target, EMBED_PHASE_NAME, destination, "")?;
            if created.is_applied() {
                outcomes.push(created);
            }
            let embed_phase = graph.find_copy_files_phase(&target_id, EMBED_PHASE_NAME)?;
            let build_file = BuildFile::for_file(file).with_attributes(copy_attributes(destination));
            if attach_build_file(graph, &embed_phase, build_file)? {
                tracing::info!("Embedded {} in {}", label, target);
                outcomes.push(Outcome::applied(format!("Embedded '{}' in '{}'", label, target)));
            } else {
                outcomes.push(Outcome::unchanged(format!(
                    "'{}' is already embedded in '{}'",
                    label, target
                )));
            }
        }
        Ok(Outcome::merge(outcomes))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::project_with;
    use crate::types::{BuildPhase, PhaseKind};

    fn phase_files(graph: &ProjectGraph, phase: &ObjectId) -> Vec<BuildFile> {
        graph
            .objects
            .get::<BuildPhase>(phase)
            .unwrap()
            .files
            .iter()
            .map(|id| graph.objects.get::<BuildFile>(id).unwrap().clone())
            .collect()
    }

    #[test]
    fn test_framework_source_parse() {
        assert_eq!(FrameworkSource::parse("UIKit"), FrameworkSource::System("UIKit".into()));
        assert!(matches!(FrameworkSource::parse("Foo.framework"), FrameworkSource::Custom(_)));
        assert!(matches!(
            FrameworkSource::parse("Vendor/Bar.xcframework"),
            FrameworkSource::Custom(_)
        ));
    }

    #[test]
    fn test_link_system_framework() {
        let mut graph = project_with(&["App"]);
        add_framework(&mut graph, "App", "UIKit", false).unwrap();
        graph.validate().unwrap();

        let (id, file) = graph
            .objects
            .iter::<FileReference>()
            .find(|(_, f)| f.display_name() == "UIKit.framework")
            .unwrap();
        assert_eq!(file.source_tree, SourceTree::SdkRoot);
        assert_eq!(file.path, "System/Library/Frameworks/UIKit.framework");
        let group = graph.find_group("Frameworks").unwrap();
        assert_eq!(graph.parent_group(id), Some(group));

        let app = graph.find_target("App").unwrap();
        let phase = graph.find_phase(&app, PhaseVariant::Frameworks).unwrap().unwrap();
        assert_eq!(phase_files(&graph, &phase).len(), 1);

        // Linking twice is a no-op, and a second target reuses the reference
        assert!(!add_framework(&mut graph, "App", "UIKit", false).unwrap().is_applied());
        assert_eq!(
            graph
                .objects
                .iter::<FileReference>()
                .filter(|(_, f)| f.display_name() == "UIKit.framework")
                .count(),
            1
        );
    }

    #[test]
    fn test_embed_custom_framework() {
        let mut graph = project_with(&["App"]);
        add_framework(&mut graph, "App", "Vendor/Foo.xcframework", true).unwrap();
        graph.validate().unwrap();

        let app = graph.find_target("App").unwrap();
        let embed = graph.find_copy_files_phase(&app, EMBED_PHASE_NAME).unwrap();
        let phase = graph.objects.get::<BuildPhase>(&embed).unwrap();
        assert!(matches!(
            phase.kind,
            PhaseKind::CopyFiles { destination: CopyDestination::Frameworks, .. }
        ));
        let files = phase_files(&graph, &embed);
        assert_eq!(files.len(), 1);
        assert!(files[0].settings.contains_key("ATTRIBUTES"));

        let file = graph.find_file_reference("Vendor/Foo.xcframework").unwrap();
        let file = graph.objects.get::<FileReference>(&file).unwrap();
        assert_eq!(file.source_tree, SourceTree::SourceRoot);
        assert_eq!(file.last_known_file_type.as_deref(), Some("wrapper.xcframework"));
    }

    #[test]
    fn test_system_framework_cannot_be_embedded() {
        let mut graph = project_with(&["App"]);
        let before = graph.clone();
        assert!(matches!(
            add_framework(&mut graph, "App", "UIKit", true),
            Err(GraphError::InvalidArgument(_))
        ));
        assert_eq!(graph, before);
    }
}
