//! Build-phase classifier and build-phase operations
//!
//! A file added to a target lands in the first phase of the variant its
//! extension calls for; that phase is created when the target has none.

use serde::Serialize;
use std::path::Path;

use super::{purge, Outcome};
use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::types::{
    BuildFile, BuildPhase, CopyDestination, FileReference, ObjectId, PhaseKind, PhaseVariant,
    Target,
};

const SOURCE_EXTENSIONS: &[&str] = &["swift", "m", "mm", "c", "cpp", "cc", "cxx"];
const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hxx"];

/// What a file contributes to a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Source,
    Header,
    Resource,
}

impl FileRole {
    pub fn phase_variant(self) -> PhaseVariant {
        match self {
            FileRole::Source => PhaseVariant::Sources,
            FileRole::Header => PhaseVariant::Headers,
            FileRole::Resource => PhaseVariant::Resources,
        }
    }
}

/// Classify a file by extension; anything unknown is a resource
pub fn classify(path: &str) -> FileRole {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if SOURCE_EXTENSIONS.contains(&ext.as_str()) {
        FileRole::Source
    } else if HEADER_EXTENSIONS.contains(&ext.as_str()) {
        FileRole::Header
    } else {
        FileRole::Resource
    }
}

/// First phase of a payload-free variant on the target, created when missing
pub fn ensure_phase(graph: &mut ProjectGraph, target: &ObjectId, variant: PhaseVariant) -> Result<ObjectId> {
    if let Some(phase) = graph.find_phase(target, variant)? {
        return Ok(phase);
    }
    let kind = variant.empty_kind().ok_or_else(|| {
        GraphError::InvalidArgument(format!("{} phases need explicit parameters", variant))
    })?;
    let phase = graph.objects.insert(BuildPhase::new(kind));
    graph.objects.get_mut::<Target>(target)?.build_phases.push(phase.clone());
    tracing::debug!("Created {} phase", variant);
    Ok(phase)
}

/// Append a build file to `phase` unless one for the same file or product is
/// already there. Returns whether it was added.
pub(crate) fn attach_build_file(graph: &mut ProjectGraph, phase: &ObjectId, build_file: BuildFile) -> Result<bool> {
    let existing = graph.objects.get::<BuildPhase>(phase)?;
    let duplicate = existing.files.iter().any(|id| {
        graph
            .objects
            .get::<BuildFile>(id)
            .map(|bf| {
                (build_file.file_ref.is_some() && bf.file_ref == build_file.file_ref)
                    || (build_file.product_ref.is_some() && bf.product_ref == build_file.product_ref)
            })
            .unwrap_or(false)
    });
    if duplicate {
        return Ok(false);
    }
    let id = graph.objects.insert(build_file);
    graph.objects.get_mut::<BuildPhase>(phase)?.files.push(id);
    Ok(true)
}

/// Add a file reference to the phase its extension calls for.
///
/// A second add of the same file to the same phase is a no-op.
pub fn add_file_to_target(graph: &mut ProjectGraph, file: &ObjectId, target: &ObjectId) -> Result<Outcome> {
    let file_ref = graph.objects.get::<FileReference>(file)?;
    let display_name = file_ref.display_name().to_string();
    let variant = classify(&file_ref.path).phase_variant();
    let target_name = graph.target(target)?.name.clone();

    let phase = ensure_phase(graph, target, variant)?;
    if attach_build_file(graph, &phase, BuildFile::for_file(file.clone()))? {
        tracing::info!("Added {} to {} phase of {}", display_name, variant, target_name);
        Ok(Outcome::applied(format!(
            "Added '{}' to the {} phase of '{}'",
            display_name, variant, target_name
        )))
    } else {
        Ok(Outcome::unchanged(format!(
            "'{}' is already in the {} phase of '{}'",
            display_name, variant, target_name
        )))
    }
}

/// Add a build phase to a target.
///
/// Sources/Resources/Frameworks/Headers are unique per target; run-script and
/// copy-files phases may repeat (copy-files phases are unique by name).
pub fn add_build_phase(
    graph: &mut ProjectGraph,
    target: &str,
    kind: PhaseKind,
    name: Option<&str>,
) -> Result<Outcome> {
    let target_id = graph.find_target(target)?;
    let variant = kind.variant();
    match &kind {
        PhaseKind::CopyFiles { destination, subpath } => {
            let name = name.unwrap_or(variant.default_name());
            return add_copy_files_phase(graph, target, name, *destination, subpath);
        }
        PhaseKind::ShellScript { script, .. } if script.trim().is_empty() => {
            return Err(GraphError::InvalidArgument(
                "A run script phase needs a script".to_string(),
            ));
        }
        PhaseKind::ShellScript { .. } => {}
        _ => {
            if graph.find_phase(&target_id, variant)?.is_some() {
                return Ok(Outcome::unchanged(format!(
                    "Target '{}' already has a {} phase",
                    target, variant
                )));
            }
        }
    }

    let phase = graph.objects.insert(BuildPhase {
        name: name.map(str::to_string),
        kind,
        files: Vec::new(),
    });
    graph.objects.get_mut::<Target>(&target_id)?.build_phases.push(phase);
    let label = name.unwrap_or(variant.default_name());
    tracing::info!("Added {} phase '{}' to {}", variant, label, target);
    Ok(Outcome::applied(format!(
        "Added {} phase '{}' to '{}'",
        variant, label, target
    )))
}

pub fn add_copy_files_phase(
    graph: &mut ProjectGraph,
    target: &str,
    name: &str,
    destination: CopyDestination,
    subpath: &str,
) -> Result<Outcome> {
    let target_id = graph.find_target(target)?;
    if graph.find_copy_files_phase(&target_id, name).is_ok() {
        return Ok(Outcome::unchanged(format!(
            "Target '{}' already has a copy files phase named '{}'",
            target, name
        )));
    }
    let phase = graph.objects.insert(BuildPhase {
        name: Some(name.to_string()),
        kind: PhaseKind::CopyFiles {
            destination,
            subpath: subpath.to_string(),
        },
        files: Vec::new(),
    });
    graph.objects.get_mut::<Target>(&target_id)?.build_phases.push(phase);
    tracing::info!("Added copy files phase {} ({}) to {}", name, destination, target);
    Ok(Outcome::applied(format!(
        "Added copy files phase '{}' ({}) to '{}'",
        name, destination, target
    )))
}

pub fn remove_copy_files_phase(graph: &mut ProjectGraph, target: &str, name: &str) -> Result<Outcome> {
    let target_id = graph.find_target(target)?;
    let phase = graph.find_copy_files_phase(&target_id, name)?;
    purge(graph, &phase)?;
    tracing::info!("Removed copy files phase {} from {}", name, target);
    Ok(Outcome::applied(format!(
        "Removed copy files phase '{}' from '{}'",
        name, target
    )))
}

/// Attributes of a build file copied to `destination`
pub(crate) fn copy_attributes(destination: CopyDestination) -> &'static [&'static str] {
    if destination.signs_on_copy() {
        &["CodeSignOnCopy", "RemoveHeadersOnCopy"]
    } else {
        &[]
    }
}

/// Add files (or other targets' products) to a named copy-files phase.
///
/// Each entry resolves as a file first, then as a target name whose product is
/// copied. Every entry must resolve before anything changes.
pub fn add_to_copy_files_phase(
    graph: &mut ProjectGraph,
    target: &str,
    phase_name: &str,
    files: &[String],
) -> Result<Outcome> {
    if files.is_empty() {
        return Err(GraphError::InvalidArgument("No files given".to_string()));
    }
    let target_id = graph.find_target(target)?;
    let phase = graph.find_copy_files_phase(&target_id, phase_name)?;
    let destination = match graph.objects.get::<BuildPhase>(&phase)?.kind {
        PhaseKind::CopyFiles { destination, .. } => destination,
        _ => CopyDestination::AbsolutePath,
    };

    let mut resolved = Vec::new();
    for file in files {
        let id = match graph.find_file_reference(file) {
            Ok(id) => id,
            Err(miss) => match graph.find_target(file) {
                Ok(other) => graph.target(&other)?.product_reference.clone().ok_or(miss)?,
                Err(_) => return Err(miss),
            },
        };
        resolved.push((file, id));
    }

    let mut added = Vec::new();
    let mut skipped = Vec::new();
    for (file, id) in resolved {
        let build_file = BuildFile::for_file(id).with_attributes(copy_attributes(destination));
        if attach_build_file(graph, &phase, build_file)? {
            added.push(file.as_str());
        } else {
            skipped.push(file.as_str());
        }
    }

    let mut message = format!(
        "Added {} file(s) to copy files phase '{}' of '{}'",
        added.len(),
        phase_name,
        target
    );
    if !skipped.is_empty() {
        message.push_str(&format!(" (already present: {})", skipped.join(", ")));
    }
    tracing::info!("{}", message);
    if added.is_empty() {
        Ok(Outcome::unchanged(message))
    } else {
        Ok(Outcome::applied(message))
    }
}

/// Row of [`list_copy_files_phases`]
#[derive(Debug, Clone, Serialize)]
pub struct CopyFilesPhaseEntry {
    pub name: String,
    pub destination: CopyDestination,
    pub subfolder_spec: u8,
    pub subpath: String,
    pub files: Vec<String>,
}

pub fn list_copy_files_phases(graph: &ProjectGraph, target: &str) -> Result<Vec<CopyFilesPhaseEntry>> {
    let target_id = graph.find_target(target)?;
    let mut rows = Vec::new();
    for phase_id in &graph.target(&target_id)?.build_phases {
        let phase = graph.objects.get::<BuildPhase>(phase_id)?;
        let PhaseKind::CopyFiles { destination, subpath } = &phase.kind else {
            continue;
        };
        let files = phase
            .files
            .iter()
            .filter_map(|id| graph.objects.get::<BuildFile>(id).ok())
            .filter_map(|bf| bf.file_ref.as_ref())
            .filter_map(|id| graph.objects.get::<FileReference>(id).ok())
            .map(|file| file.display_name().to_string())
            .collect();
        rows.push(CopyFilesPhaseEntry {
            name: phase.display_name().to_string(),
            destination: *destination,
            subfolder_spec: destination.subfolder_spec(),
            subpath: subpath.clone(),
            files,
        });
    }
    Ok(rows)
}

/// Phase kind from caller arguments; run scripts need `script`, copy-files
/// phases need `destination`.
pub fn phase_kind_from_args(
    variant: PhaseVariant,
    script: Option<&str>,
    shell: Option<&str>,
    destination: Option<&str>,
    subpath: Option<&str>,
) -> Result<PhaseKind> {
    match variant {
        PhaseVariant::ShellScript => {
            let script = script.ok_or_else(|| {
                GraphError::InvalidArgument("run_script phases require 'script'".to_string())
            })?;
            let mut kind = PhaseKind::shell_script(script);
            if let (PhaseKind::ShellScript { shell_path, .. }, Some(shell)) = (&mut kind, shell) {
                *shell_path = shell.to_string();
            }
            Ok(kind)
        }
        PhaseVariant::CopyFiles => {
            let destination = destination.ok_or_else(|| {
                GraphError::InvalidArgument("copy_files phases require 'destination'".to_string())
            })?;
            Ok(PhaseKind::CopyFiles {
                destination: destination.parse()?,
                subpath: subpath.unwrap_or_default().to_string(),
            })
        }
        other => other.empty_kind().ok_or_else(|| {
            GraphError::InvalidArgument(format!("{} phases need parameters", other))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::project_with;
    use crate::ops::attach_child;
    use crate::types::SourceTree;

    fn add_file(graph: &mut ProjectGraph, path: &str) -> ObjectId {
        let id = graph.objects.insert(FileReference {
            name: None,
            path: path.into(),
            source_tree: SourceTree::SourceRoot,
            last_known_file_type: None,
            explicit_file_type: None,
        });
        let main = graph.main_group().unwrap();
        attach_child(graph, &main, id.clone()).unwrap();
        id
    }

    fn phase_files(graph: &ProjectGraph, target: &ObjectId, variant: PhaseVariant) -> usize {
        graph
            .find_phase(target, variant)
            .unwrap()
            .map(|id| graph.objects.get::<BuildPhase>(&id).unwrap().files.len())
            .unwrap_or(0)
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("App/main.swift"), FileRole::Source);
        assert_eq!(classify("Bridge.MM"), FileRole::Source);
        assert_eq!(classify("Kit.hpp"), FileRole::Header);
        assert_eq!(classify("Assets.xcassets"), FileRole::Resource);
        assert_eq!(classify("LICENSE"), FileRole::Resource);
    }

    #[test]
    fn test_add_file_routes_by_extension_and_creates_phase() {
        let mut graph = project_with(&["App"]);
        let app = graph.find_target("App").unwrap();
        let header = add_file(&mut graph, "App/Bridge.h");
        let source = add_file(&mut graph, "App/main.swift");
        assert!(graph.find_phase(&app, PhaseVariant::Headers).unwrap().is_none());

        add_file_to_target(&mut graph, &header, &app).unwrap();
        add_file_to_target(&mut graph, &source, &app).unwrap();
        assert_eq!(phase_files(&graph, &app, PhaseVariant::Headers), 1);
        assert_eq!(phase_files(&graph, &app, PhaseVariant::Sources), 1);
        graph.validate().unwrap();
    }

    #[test]
    fn test_same_file_twice_is_deduplicated() {
        let mut graph = project_with(&["App"]);
        let app = graph.find_target("App").unwrap();
        let source = add_file(&mut graph, "App/main.swift");
        assert!(add_file_to_target(&mut graph, &source, &app).unwrap().is_applied());
        assert!(!add_file_to_target(&mut graph, &source, &app).unwrap().is_applied());
        assert_eq!(phase_files(&graph, &app, PhaseVariant::Sources), 1);
    }

    #[test]
    fn test_add_build_phase_kinds() {
        let mut graph = project_with(&["App"]);
        let app = graph.find_target("App").unwrap();
        assert!(!add_build_phase(&mut graph, "App", PhaseKind::Sources, None).unwrap().is_applied());
        assert!(add_build_phase(&mut graph, "App", PhaseKind::Headers, None).unwrap().is_applied());

        let script = phase_kind_from_args(PhaseVariant::ShellScript, Some("swiftlint"), None, None, None).unwrap();
        add_build_phase(&mut graph, "App", script.clone(), Some("Lint")).unwrap();
        add_build_phase(&mut graph, "App", script, Some("Lint again")).unwrap();
        let scripts = graph
            .target(&app)
            .unwrap()
            .build_phases
            .iter()
            .filter(|id| graph.objects.get::<BuildPhase>(id).unwrap().kind.variant() == PhaseVariant::ShellScript)
            .count();
        assert_eq!(scripts, 2);

        assert!(matches!(
            phase_kind_from_args(PhaseVariant::CopyFiles, None, None, None, None),
            Err(GraphError::InvalidArgument(_))
        ));
        assert!(matches!(
            add_build_phase(&mut graph, "App", PhaseKind::shell_script("  "), None),
            Err(GraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_copy_files_phase_lifecycle() {
        let mut graph = project_with(&["App", "Helper"]);
        let plugin = add_file(&mut graph, "Plugins/Thing.bundle");

        add_copy_files_phase(&mut graph, "App", "Embed Plugins", CopyDestination::Plugins, "").unwrap();
        assert!(!add_copy_files_phase(&mut graph, "App", "Embed Plugins", CopyDestination::Plugins, "")
            .unwrap()
            .is_applied());

        let outcome = add_to_copy_files_phase(
            &mut graph,
            "App",
            "Embed Plugins",
            &["Plugins/Thing.bundle".to_string(), "Helper".to_string()],
        )
        .unwrap();
        assert!(outcome.is_applied());
        let again = add_to_copy_files_phase(&mut graph, "App", "Embed Plugins", &["Thing.bundle".to_string()]).unwrap();
        assert!(!again.is_applied());

        let rows = list_copy_files_phases(&graph, "App").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subfolder_spec, 13);
        assert_eq!(rows[0].files, vec!["Thing.bundle".to_string(), "Helper.app".to_string()]);

        // Unknown entries abort the whole call
        assert!(add_to_copy_files_phase(&mut graph, "App", "Embed Plugins", &["Nope.txt".to_string()]).is_err());

        remove_copy_files_phase(&mut graph, "App", "Embed Plugins").unwrap();
        assert!(list_copy_files_phases(&graph, "App").unwrap().is_empty());
        assert!(graph.build_files_for(&plugin).is_empty());
        graph.validate().unwrap();
    }
}
