use pbxgraph_core::ops::files::FileEntry;
use pbxgraph_core::ops::groups::GroupEntry;
use pbxgraph_core::ops::packages::PackageEntry;
use pbxgraph_core::ops::phases::CopyFilesPhaseEntry;
use pbxgraph_core::ops::settings::{ConfigurationEntry, ConfigurationSettings};
use pbxgraph_core::ops::sync_folder::SyncFolderEntry;
use pbxgraph_core::ops::targets::TargetSummary;
use pbxgraph_core::{EngineConfig, GraphError, Mutation, ProjectGraph, Result, Workspace};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable naming an engine config file that overrides discovery
pub const CONFIG_ENV: &str = "PBXGRAPH_CONFIG";

/// Transactions against project documents on disk
#[derive(Clone)]
pub struct ProjectClient {
    workspace: Arc<Workspace>,
}

impl ProjectClient {
    pub fn new() -> Self {
        Self {
            workspace: Arc::new(Workspace::new()),
        }
    }

    /// Engine config for a document: `$PBXGRAPH_CONFIG` when set, otherwise
    /// the usual discovery next to the document
    pub fn config_for(&self, project_path: &str) -> Result<EngineConfig> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => EngineConfig::from_file(Path::new(&path)),
            None => EngineConfig::discover(Path::new(project_path)),
        }
    }

    pub fn edit<R, F>(&self, project_path: &str, f: F) -> Result<R>
    where
        R: Mutation,
        F: FnOnce(&mut ProjectGraph) -> Result<R>,
    {
        self.workspace.edit(Path::new(project_path), f)
    }

    pub fn read<R>(&self, project_path: &str, f: impl FnOnce(&ProjectGraph) -> Result<R>) -> Result<R> {
        self.workspace.read(Path::new(project_path), f)
    }

    pub fn create(&self, project_path: &str, name: &str) -> Result<String> {
        let path = PathBuf::from(project_path);
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let graph = ProjectGraph::new(name).with_source_root(root);
        self.workspace.create(&path, &graph)?;
        Ok(format!("Created project '{}' at {}", name, project_path))
    }
}

/// Parse a caller-supplied enum value
pub fn parse<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = GraphError>,
{
    value.parse()
}

pub fn render_targets(targets: &[TargetSummary]) -> String {
    if targets.is_empty() {
        return "No targets.".to_string();
    }
    let mut out = Vec::new();
    for target in targets {
        out.push(format!("{} ({})", target.name, target.product_type));
        if let Some(product) = &target.product {
            out.push(format!("  product: {}", product));
        }
        out.push(format!("  phases: {}", target.build_phases.join(", ")));
        if !target.dependencies.is_empty() {
            out.push(format!("  depends on: {}", target.dependencies.join(", ")));
        }
        if !target.package_products.is_empty() {
            out.push(format!("  packages: {}", target.package_products.join(", ")));
        }
        if !target.synchronized_folders.is_empty() {
            out.push(format!(
                "  synchronized folders: {}",
                target.synchronized_folders.join(", ")
            ));
        }
    }
    out.join("\n")
}

pub fn render_files(files: &[FileEntry]) -> String {
    if files.is_empty() {
        return "No files.".to_string();
    }
    files
        .iter()
        .map(|file| {
            let kind = file.file_type.as_deref().unwrap_or("unknown");
            if file.phases.is_empty() {
                format!("{} [{}]", file.path, kind)
            } else {
                format!("{} [{}] -> {}", file.path, kind, file.phases.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_groups(groups: &[GroupEntry]) -> String {
    if groups.is_empty() {
        return "No groups.".to_string();
    }
    groups
        .iter()
        .map(|group| {
            let name = group.path.rsplit('/').next().unwrap_or(&group.path);
            let marker = if group.synchronized { " (synchronized)" } else { "" };
            format!(
                "{}{}/{} - {} item(s)",
                "  ".repeat(group.depth),
                name,
                marker,
                group.children
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_packages(packages: &[PackageEntry]) -> String {
    if packages.is_empty() {
        return "No Swift packages.".to_string();
    }
    let mut out = Vec::new();
    for package in packages {
        match &package.requirement {
            Some(requirement) => out.push(format!(
                "{} [{}] {} ({})",
                package.name, package.kind, package.location, requirement
            )),
            None => out.push(format!("{} [{}] {}", package.name, package.kind, package.location)),
        }
        for product in &package.products {
            out.push(format!("  - {}", product));
        }
    }
    out.join("\n")
}

pub fn render_sync_folders(folders: &[SyncFolderEntry]) -> String {
    if folders.is_empty() {
        return "No synchronized folders.".to_string();
    }
    let mut out = Vec::new();
    for folder in folders {
        out.push(format!("{} (targets: {})", folder.path, folder.targets.join(", ")));
        for set in &folder.exceptions {
            out.push(format!("  except for {}: {}", set.target, set.files.join(", ")));
        }
    }
    out.join("\n")
}

pub fn render_copy_files_phases(phases: &[CopyFilesPhaseEntry]) -> String {
    if phases.is_empty() {
        return "No copy files phases.".to_string();
    }
    let mut out = Vec::new();
    for phase in phases {
        let subpath = if phase.subpath.is_empty() {
            String::new()
        } else {
            format!(", subpath {}", phase.subpath)
        };
        out.push(format!(
            "{} -> {} (dstSubfolderSpec {}{})",
            phase.name, phase.destination, phase.subfolder_spec, subpath
        ));
        for file in &phase.files {
            out.push(format!("  - {}", file));
        }
    }
    out.join("\n")
}

pub fn render_configurations(configurations: &[ConfigurationEntry]) -> String {
    configurations
        .iter()
        .map(|c| {
            let default = if c.is_default { " (default)" } else { "" };
            format!("{}{} - {} setting(s)", c.name, default, c.setting_count)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_settings(settings: &[ConfigurationSettings]) -> Result<String> {
    Ok(serde_json::to_string_pretty(settings)?)
}

pub fn render_violations(violations: &[String]) -> String {
    if violations.is_empty() {
        return "Project is valid.".to_string();
    }
    let mut out = vec![format!("{} problem(s) found:", violations.len())];
    out.extend(violations.iter().map(|v| format!("  - {}", v)));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbxgraph_core::ops::groups::create_group;
    use pbxgraph_core::ops::groups::list_groups;
    use pbxgraph_core::ProductType;
    use tempfile::TempDir;

    #[test]
    fn test_create_then_edit_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Demo.pbxgraph.json");
        let path = path.to_string_lossy().to_string();
        let client = ProjectClient::new();

        client.create(&path, "Demo").unwrap();
        assert!(matches!(
            client.create(&path, "Demo"),
            Err(GraphError::AlreadyExists { .. })
        ));

        client
            .edit(&path, |graph| create_group(graph, "Models", None, None))
            .unwrap();
        let rendered = client
            .read(&path, |graph| Ok(render_groups(&list_groups(graph)?)))
            .unwrap();
        assert!(rendered.contains("Models/"));
    }

    #[test]
    fn test_parse_errors_are_invalid_arguments() {
        assert!(parse::<ProductType>("app").is_ok());
        assert!(matches!(
            parse::<ProductType>("spaceship"),
            Err(GraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_render_violations() {
        assert_eq!(render_violations(&[]), "Project is valid.");
        let text = render_violations(&["duplicate target name 'App'".to_string()]);
        assert!(text.starts_with("1 problem(s) found"));
    }
}
