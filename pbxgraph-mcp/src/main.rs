use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ErrorData as McpError, *},
    schemars, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
    transport::stdio,
};
use serde::Deserialize;
use std::borrow::Cow;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pbxgraph_core::fs_effects;
use pbxgraph_core::ops::{
    dependencies, files, frameworks, groups, packages, phases, settings, sync_folder, targets,
};
use pbxgraph_core::types::Group;
use pbxgraph_core::{
    CopyDestination, Outcome, PhaseVariant, Platform, ProductType, SettingValue,
    VersionRequirement,
};

mod tools;
use tools::{parse, ProjectClient};

/// pbxgraph MCP Server - edits project documents one transaction per tool call
#[derive(Clone)]
pub struct PbxGraphServer {
    client: ProjectClient,
    tool_router: ToolRouter<PbxGraphServer>,
}

// ============================================================================
// Project
// ============================================================================

/// Parameters for create_project tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateProjectParams {
    /// Where the new project document is written
    #[schemars(description = "Path of the new project document")]
    pub project_path: String,
    /// Project name
    #[schemars(description = "Project name")]
    pub name: String,
}

/// Parameters for tools that only need the document
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProjectParams {
    /// Path of the project document
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
}

// ============================================================================
// Targets
// ============================================================================

/// Parameters for create_target tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateTargetParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    /// Name of the new target
    #[schemars(description = "Target name")]
    pub name: String,
    /// Product type (e.g., "app", "framework", "unit_test", "app_extension")
    #[schemars(description = "Product type, e.g. app, framework, static_library, unit_test, ui_test, app_extension")]
    pub product_type: String,
    #[schemars(description = "Platform: iOS, macOS, tvOS, watchOS or visionOS (default: iOS)")]
    pub platform: Option<String>,
    #[schemars(description = "Bundle identifier (default: <prefix>.<name>)")]
    pub bundle_identifier: Option<String>,
    #[schemars(description = "Minimum OS version (default: configured per platform)")]
    pub deployment_target: Option<String>,
}

/// Parameters for tools addressing one target
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TargetParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Target name")]
    pub target: String,
}

/// Parameters for rename_target tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RenameTargetParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Current target name")]
    pub old_name: String,
    #[schemars(description = "New target name")]
    pub new_name: String,
}

/// Parameters for duplicate_target tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DuplicateTargetParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Target to copy")]
    pub source: String,
    #[schemars(description = "Name of the copy")]
    pub new_name: String,
}

/// Parameters for add_dependency / remove_dependency tools
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DependencyParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    /// The target that depends on the other one
    #[schemars(description = "Dependent target")]
    pub target: String,
    #[schemars(description = "Target it depends on")]
    pub depends_on: String,
}

// ============================================================================
// Files and groups
// ============================================================================

/// Parameters for add_file tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddFileParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    /// File path, relative to the project directory or absolute
    #[schemars(description = "File path (project-relative or absolute)")]
    pub file_path: String,
    #[schemars(description = "Group path such as 'App/Models' (default: main group)")]
    pub group: Option<String>,
    #[schemars(description = "Target whose matching build phase receives the file")]
    pub target: Option<String>,
}

/// Parameters for remove_file tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveFileParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "File path, group path or file name")]
    pub file_path: String,
    #[schemars(description = "Also delete the file from disk (default: false)")]
    pub delete_from_disk: Option<bool>,
}

/// Parameters for move_file tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MoveFileParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "File path, group path or file name")]
    pub file_path: String,
    #[schemars(description = "Destination group path")]
    pub to_group: Option<String>,
    #[schemars(description = "New project-relative file path")]
    pub new_path: Option<String>,
    #[schemars(description = "Also move the file on disk (default: false)")]
    pub move_on_disk: Option<bool>,
}

/// Parameters for list_files tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListFilesParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Only files in this target's build phases")]
    pub target: Option<String>,
}

/// Parameters for create_group tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateGroupParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Group name")]
    pub name: String,
    #[schemars(description = "Parent group path (default: main group)")]
    pub parent: Option<String>,
    #[schemars(description = "Directory the group maps to (default: its name)")]
    pub path: Option<String>,
}

/// Parameters for rename_group tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RenameGroupParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Group path such as 'App/Models'")]
    pub group: String,
    #[schemars(description = "New group name")]
    pub new_name: String,
}

/// Parameters for remove_group tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveGroupParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Group path such as 'App/Models'")]
    pub group: String,
    #[schemars(description = "Remove children as well (default: false)")]
    pub recursive: Option<bool>,
    #[schemars(description = "Also delete the group's directory from disk (default: false)")]
    pub delete_from_disk: Option<bool>,
}

// ============================================================================
// Frameworks and build phases
// ============================================================================

/// Parameters for add_framework tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddFrameworkParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Target name")]
    pub target: String,
    /// A system framework name ("UIKit") or a path to a custom .framework/.xcframework
    #[schemars(description = "System framework name or path to a .framework/.xcframework")]
    pub framework: String,
    #[schemars(description = "Embed the framework into the product (default: false)")]
    pub embed: Option<bool>,
}

/// Parameters for add_build_phase tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddBuildPhaseParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Target name")]
    pub target: String,
    #[schemars(description = "Phase type: sources, resources, frameworks, headers, run_script or copy_files")]
    pub phase_type: String,
    #[schemars(description = "Phase name (run_script and copy_files)")]
    pub name: Option<String>,
    #[schemars(description = "Script text (run_script)")]
    pub script: Option<String>,
    #[schemars(description = "Shell (run_script, default: /bin/sh)")]
    pub shell: Option<String>,
    #[schemars(description = "Destination (copy_files): resources, frameworks, executables, plugins, shared_support, ...")]
    pub destination: Option<String>,
    #[schemars(description = "Destination subpath (copy_files)")]
    pub subpath: Option<String>,
}

/// Parameters for add_copy_files_phase tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddCopyFilesPhaseParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Target name")]
    pub target: String,
    #[schemars(description = "Phase name")]
    pub name: String,
    #[schemars(description = "Destination: resources, frameworks, executables, plugins, shared_support, ...")]
    pub destination: String,
    #[schemars(description = "Destination subpath")]
    pub subpath: Option<String>,
}

/// Parameters for remove_copy_files_phase tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CopyFilesPhaseParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Target name")]
    pub target: String,
    #[schemars(description = "Phase name")]
    pub name: String,
}

/// Parameters for add_to_copy_files_phase tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddToCopyFilesPhaseParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Target name")]
    pub target: String,
    #[schemars(description = "Phase name")]
    pub name: String,
    #[schemars(description = "Files already in the project")]
    pub files: Vec<String>,
}

// ============================================================================
// Swift packages
// ============================================================================

/// Parameters for add_swift_package tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddSwiftPackageParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Repository URL")]
    pub url: String,
    /// e.g. "1.5.0", "from: 1.5.0", "exact: 2.0.0", "branch: main"
    #[schemars(description = "Version requirement, e.g. 'from: 1.5.0', 'exact: 2.0.0', 'range: 1.0.0..<2.0.0', 'branch: main'")]
    pub requirement: String,
    #[schemars(description = "Products to link")]
    pub products: Option<Vec<String>>,
    #[schemars(description = "Target the products are linked into")]
    pub target: Option<String>,
}

/// Parameters for add_local_swift_package tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddLocalSwiftPackageParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Package directory (project-relative or absolute)")]
    pub path: String,
    #[schemars(description = "Products to link")]
    pub products: Option<Vec<String>>,
    #[schemars(description = "Target the products are linked into")]
    pub target: Option<String>,
}

/// Parameters for remove_swift_package tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveSwiftPackageParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Repository URL")]
    pub url: String,
}

/// Parameters for remove_local_swift_package tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveLocalSwiftPackageParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Package directory")]
    pub path: String,
}

// ============================================================================
// Synchronized folders
// ============================================================================

/// Parameters for add_synchronized_folder tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddSyncFolderParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Folder path (project-relative or absolute)")]
    pub folder: String,
    #[schemars(description = "Target the folder's files belong to")]
    pub target: Option<String>,
    #[schemars(description = "Parent group path (default: main group)")]
    pub group: Option<String>,
}

/// Parameters for remove_synchronized_folder tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SyncFolderParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Folder path")]
    pub folder: String,
}

/// Parameters for add/remove_target_to_synchronized_folder tools
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SyncFolderTargetParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Folder path")]
    pub folder: String,
    #[schemars(description = "Target name")]
    pub target: String,
}

/// Parameters for synchronized folder exception tools
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SyncExceptionParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Folder path")]
    pub folder: String,
    #[schemars(description = "Target name")]
    pub target: String,
    /// Paths relative to the folder
    #[schemars(description = "Files relative to the folder")]
    pub files: Vec<String>,
}

// ============================================================================
// Build settings
// ============================================================================

/// Parameters for list_build_configurations tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConfigurationsParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Target name (default: project level)")]
    pub target: Option<String>,
}

/// Parameters for get_build_settings tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetBuildSettingsParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Target name (default: project level)")]
    pub target: Option<String>,
    #[schemars(description = "Configuration name (default: all)")]
    pub configuration: Option<String>,
}

/// Parameters for set_build_setting tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetBuildSettingParams {
    #[schemars(description = "Path of the project document")]
    pub project_path: String,
    #[schemars(description = "Target name (default: project level)")]
    pub target: Option<String>,
    #[schemars(description = "Setting name, e.g. SWIFT_VERSION")]
    pub key: String,
    /// A JSON string array is stored as a list value
    #[schemars(description = "Setting value; a JSON array of strings is stored as a list")]
    pub value: String,
    #[schemars(description = "Configuration name (default: all)")]
    pub configuration: Option<String>,
}

/// Helper to create MCP errors
fn mcp_error(msg: impl Into<String>) -> McpError {
    McpError {
        code: ErrorCode(-32603),
        message: Cow::from(msg.into()),
        data: None,
    }
}

/// Lookup misses become a descriptive result, everything else a protocol error
fn reply(result: pbxgraph_core::Result<String>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) if e.is_recoverable() => {
            tracing::debug!("Recoverable failure: {}", e);
            Ok(CallToolResult::success(vec![Content::text(format!("Error: {}", e))]))
        }
        Err(e) => {
            tracing::warn!("Tool failed: {}", e);
            Err(mcp_error(e.to_string()))
        }
    }
}

fn described(outcome: pbxgraph_core::Result<Outcome>) -> pbxgraph_core::Result<String> {
    outcome.map(|o| o.to_string())
}

fn target_spec(params: &CreateTargetParams) -> pbxgraph_core::Result<targets::TargetSpec> {
    let product_type: ProductType = parse(&params.product_type)?;
    let mut spec = targets::TargetSpec::new(&params.name, product_type);
    if let Some(platform) = &params.platform {
        spec = spec.with_platform(parse::<Platform>(platform)?);
    }
    spec.bundle_identifier = params.bundle_identifier.clone();
    spec.deployment_target = params.deployment_target.clone();
    Ok(spec)
}

#[tool_router]
impl PbxGraphServer {
    pub fn new() -> Self {
        Self {
            client: ProjectClient::new(),
            tool_router: Self::tool_router(),
        }
    }

    // ------------------------------------------------------------------------
    // Project
    // ------------------------------------------------------------------------

    #[tool(description = "Create a new, empty project document")]
    async fn create_project(
        &self,
        Parameters(params): Parameters<CreateProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.client.create(&params.project_path, &params.name))
    }

    #[tool(description = "Check a project document for broken references and report every problem")]
    async fn validate_project(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.client.read(&params.project_path, |graph| {
            Ok(tools::render_violations(&graph.violations()))
        }))
    }

    // ------------------------------------------------------------------------
    // Targets
    // ------------------------------------------------------------------------

    #[tool(description = "List every target with its product, build phases and dependencies")]
    async fn list_targets(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.client.read(&params.project_path, |graph| {
            Ok(tools::render_targets(&targets::list_targets(graph)?))
        }))
    }

    #[tool(description = "Create a target with its product, build phases and Debug/Release configurations")]
    async fn create_target(
        &self,
        Parameters(params): Parameters<CreateTargetParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = target_spec(&params).and_then(|spec| {
            let config = self.client.config_for(&params.project_path)?;
            self.client.edit(&params.project_path, |graph| {
                targets::create_target(graph, &config, &spec)
            })
        });
        reply(described(result))
    }

    #[tool(description = "Remove a target and everything that refers to it")]
    async fn remove_target(
        &self,
        Parameters(params): Parameters<TargetParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            targets::remove_target(graph, &params.target)
        })))
    }

    #[tool(description = "Rename a target, its product and the settings derived from its name")]
    async fn rename_target(
        &self,
        Parameters(params): Parameters<RenameTargetParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            targets::rename_target(graph, &params.old_name, &params.new_name)
        })))
    }

    #[tool(description = "Duplicate a target with its phases, settings and dependencies")]
    async fn duplicate_target(
        &self,
        Parameters(params): Parameters<DuplicateTargetParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            targets::duplicate_target(graph, &params.source, &params.new_name)
        })))
    }

    #[tool(description = "Make one target depend on another")]
    async fn add_dependency(
        &self,
        Parameters(params): Parameters<DependencyParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            dependencies::add_dependency(graph, &params.target, &params.depends_on)
        })))
    }

    #[tool(description = "Remove a dependency between two targets")]
    async fn remove_dependency(
        &self,
        Parameters(params): Parameters<DependencyParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            dependencies::remove_dependency(graph, &params.target, &params.depends_on)
        })))
    }

    // ------------------------------------------------------------------------
    // Files and groups
    // ------------------------------------------------------------------------

    #[tool(description = "Add a file to a group and optionally to a target's matching build phase")]
    async fn add_file(
        &self,
        Parameters(params): Parameters<AddFileParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            files::add_file(
                graph,
                &params.file_path,
                params.group.as_deref(),
                params.target.as_deref(),
            )
        })))
    }

    #[tool(description = "Remove a file and its build phase memberships, optionally deleting it from disk")]
    async fn remove_file(
        &self,
        Parameters(params): Parameters<RemoveFileParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.client.edit(&params.project_path, |graph| {
            let id = graph.find_file_reference(&params.file_path)?;
            let on_disk = graph.disk_path(&id);
            let outcome = files::remove_file(graph, &params.file_path)?;
            Ok((outcome, on_disk))
        });
        let result = result.and_then(|(outcome, on_disk)| {
            if params.delete_from_disk.unwrap_or(false) && outcome.is_applied() {
                fs_effects::delete_path(&on_disk)?;
                return Ok(format!("{} (deleted {})", outcome, on_disk.display()));
            }
            Ok(outcome.to_string())
        });
        reply(result)
    }

    #[tool(description = "Move a file to another group and/or path, optionally moving it on disk")]
    async fn move_file(
        &self,
        Parameters(params): Parameters<MoveFileParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.client.edit(&params.project_path, |graph| {
            let id = graph.find_file_reference(&params.file_path)?;
            let from = graph.disk_path(&id);
            let outcome = files::move_file(
                graph,
                &params.file_path,
                params.to_group.as_deref(),
                params.new_path.as_deref(),
            )?;
            let to = graph.disk_path(&id);
            Ok((outcome, (from, to)))
        });
        let result = result.and_then(|(outcome, (from, to))| {
            if params.move_on_disk.unwrap_or(false) && outcome.is_applied() && from != to {
                fs_effects::move_path(&from, &to)?;
                return Ok(format!("{} (moved on disk to {})", outcome, to.display()));
            }
            Ok(outcome.to_string())
        });
        reply(result)
    }

    #[tool(description = "List files in the project, or only those built by one target")]
    async fn list_files(
        &self,
        Parameters(params): Parameters<ListFilesParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.client.read(&params.project_path, |graph| {
            Ok(tools::render_files(&files::list_files(graph, params.target.as_deref())?))
        }))
    }

    #[tool(description = "Create a group (nested under a parent group path if given)")]
    async fn create_group(
        &self,
        Parameters(params): Parameters<CreateGroupParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            groups::create_group(
                graph,
                &params.name,
                params.parent.as_deref(),
                params.path.as_deref(),
            )
        })))
    }

    #[tool(description = "Rename a group")]
    async fn rename_group(
        &self,
        Parameters(params): Parameters<RenameGroupParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            groups::rename_group(graph, &params.group, &params.new_name)
        })))
    }

    #[tool(description = "Remove a group; non-empty groups need recursive=true")]
    async fn remove_group(
        &self,
        Parameters(params): Parameters<RemoveGroupParams>,
    ) -> Result<CallToolResult, McpError> {
        let recursive = params.recursive.unwrap_or(false);
        let result = self.client.edit(&params.project_path, |graph| {
            let id = graph.find_group(&params.group)?;
            // Virtual groups have no directory of their own
            let directory: Option<PathBuf> = graph
                .objects
                .get::<Group>(&id)?
                .path
                .is_some()
                .then(|| graph.disk_path(&id));
            let outcome = groups::remove_group(graph, &params.group, recursive)?;
            Ok((outcome, directory))
        });
        let result = result.and_then(|(outcome, directory)| {
            match directory.filter(|_| params.delete_from_disk.unwrap_or(false)) {
                Some(directory) if outcome.is_applied() && directory.exists() => {
                    fs_effects::delete_path(&directory)?;
                    Ok(format!("{} (deleted {})", outcome, directory.display()))
                }
                _ => Ok(outcome.to_string()),
            }
        });
        reply(result)
    }

    #[tool(description = "Show the group tree below the main group")]
    async fn list_groups(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.client.read(&params.project_path, |graph| {
            Ok(tools::render_groups(&groups::list_groups(graph)?))
        }))
    }

    // ------------------------------------------------------------------------
    // Frameworks and build phases
    // ------------------------------------------------------------------------

    #[tool(description = "Link a system or custom framework into a target, optionally embedding it")]
    async fn add_framework(
        &self,
        Parameters(params): Parameters<AddFrameworkParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            frameworks::add_framework(
                graph,
                &params.target,
                &params.framework,
                params.embed.unwrap_or(false),
            )
        })))
    }

    #[tool(description = "Add a build phase (sources, resources, frameworks, headers, run_script, copy_files) to a target")]
    async fn add_build_phase(
        &self,
        Parameters(params): Parameters<AddBuildPhaseParams>,
    ) -> Result<CallToolResult, McpError> {
        let kind = parse::<PhaseVariant>(&params.phase_type).and_then(|variant| {
            phases::phase_kind_from_args(
                variant,
                params.script.as_deref(),
                params.shell.as_deref(),
                params.destination.as_deref(),
                params.subpath.as_deref(),
            )
        });
        let result = kind.and_then(|kind| {
            self.client.edit(&params.project_path, |graph| {
                phases::add_build_phase(graph, &params.target, kind, params.name.as_deref())
            })
        });
        reply(described(result))
    }

    #[tool(description = "Add a named copy files phase to a target")]
    async fn add_copy_files_phase(
        &self,
        Parameters(params): Parameters<AddCopyFilesPhaseParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = parse::<CopyDestination>(&params.destination).and_then(|destination| {
            self.client.edit(&params.project_path, |graph| {
                phases::add_copy_files_phase(
                    graph,
                    &params.target,
                    &params.name,
                    destination,
                    params.subpath.as_deref().unwrap_or_default(),
                )
            })
        });
        reply(described(result))
    }

    #[tool(description = "Remove a copy files phase and its build files")]
    async fn remove_copy_files_phase(
        &self,
        Parameters(params): Parameters<CopyFilesPhaseParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            phases::remove_copy_files_phase(graph, &params.target, &params.name)
        })))
    }

    #[tool(description = "Add project files to an existing copy files phase")]
    async fn add_to_copy_files_phase(
        &self,
        Parameters(params): Parameters<AddToCopyFilesPhaseParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            phases::add_to_copy_files_phase(graph, &params.target, &params.name, &params.files)
        })))
    }

    #[tool(description = "List a target's copy files phases with destinations and files")]
    async fn list_copy_files_phases(
        &self,
        Parameters(params): Parameters<TargetParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.client.read(&params.project_path, |graph| {
            Ok(tools::render_copy_files_phases(&phases::list_copy_files_phases(
                graph,
                &params.target,
            )?))
        }))
    }

    // ------------------------------------------------------------------------
    // Swift packages
    // ------------------------------------------------------------------------

    #[tool(description = "Add a remote Swift package and optionally link its products into a target")]
    async fn add_swift_package(
        &self,
        Parameters(params): Parameters<AddSwiftPackageParams>,
    ) -> Result<CallToolResult, McpError> {
        let products = params.products.clone().unwrap_or_default();
        let result = parse::<VersionRequirement>(&params.requirement).and_then(|requirement| {
            self.client.edit(&params.project_path, |graph| {
                packages::add_swift_package(
                    graph,
                    &params.url,
                    requirement,
                    &products,
                    params.target.as_deref(),
                )
            })
        });
        reply(described(result))
    }

    #[tool(description = "Remove a remote Swift package and every product linked from it")]
    async fn remove_swift_package(
        &self,
        Parameters(params): Parameters<RemoveSwiftPackageParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            packages::remove_swift_package(graph, &params.url)
        })))
    }

    #[tool(description = "Add a local Swift package and optionally link its products into a target")]
    async fn add_local_swift_package(
        &self,
        Parameters(params): Parameters<AddLocalSwiftPackageParams>,
    ) -> Result<CallToolResult, McpError> {
        let products = params.products.clone().unwrap_or_default();
        reply(described(self.client.edit(&params.project_path, |graph| {
            packages::add_local_package(graph, &params.path, &products, params.target.as_deref())
        })))
    }

    #[tool(description = "Remove a local Swift package and every product linked from it")]
    async fn remove_local_swift_package(
        &self,
        Parameters(params): Parameters<RemoveLocalSwiftPackageParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            packages::remove_local_package(graph, &params.path)
        })))
    }

    #[tool(description = "List remote and local Swift packages with their linked products")]
    async fn list_swift_packages(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.client.read(&params.project_path, |graph| {
            Ok(tools::render_packages(&packages::list_swift_packages(graph)?))
        }))
    }

    // ------------------------------------------------------------------------
    // Synchronized folders
    // ------------------------------------------------------------------------

    #[tool(description = "Add a synchronized folder whose contents belong to a target implicitly")]
    async fn add_synchronized_folder(
        &self,
        Parameters(params): Parameters<AddSyncFolderParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            sync_folder::add_sync_folder(
                graph,
                &params.folder,
                params.target.as_deref(),
                params.group.as_deref(),
            )
        })))
    }

    #[tool(description = "Remove a synchronized folder, its target memberships and exception sets")]
    async fn remove_synchronized_folder(
        &self,
        Parameters(params): Parameters<SyncFolderParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            sync_folder::remove_sync_folder(graph, &params.folder)
        })))
    }

    #[tool(description = "Make a target include a synchronized folder")]
    async fn add_target_to_synchronized_folder(
        &self,
        Parameters(params): Parameters<SyncFolderTargetParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            sync_folder::add_target_to_sync_folder(graph, &params.folder, &params.target)
        })))
    }

    #[tool(description = "Stop a target from including a synchronized folder; drops its exception set")]
    async fn remove_target_from_synchronized_folder(
        &self,
        Parameters(params): Parameters<SyncFolderTargetParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            sync_folder::remove_target_from_sync_folder(graph, &params.folder, &params.target)
        })))
    }

    #[tool(description = "Exclude files of a synchronized folder from one target")]
    async fn add_synchronized_folder_exception(
        &self,
        Parameters(params): Parameters<SyncExceptionParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            sync_folder::add_sync_exception(graph, &params.folder, &params.target, &params.files)
        })))
    }

    #[tool(description = "Include previously excluded files of a synchronized folder again")]
    async fn remove_synchronized_folder_exception(
        &self,
        Parameters(params): Parameters<SyncExceptionParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(described(self.client.edit(&params.project_path, |graph| {
            sync_folder::remove_sync_exception(graph, &params.folder, &params.target, &params.files)
        })))
    }

    #[tool(description = "List synchronized folders with their targets and exception sets")]
    async fn list_synchronized_folders(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.client.read(&params.project_path, |graph| {
            Ok(tools::render_sync_folders(&sync_folder::list_sync_folders(graph)?))
        }))
    }

    #[tool(description = "List the files a target gets from its synchronized folders, after exceptions")]
    async fn list_target_files(
        &self,
        Parameters(params): Parameters<TargetParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.client.config_for(&params.project_path).and_then(|config| {
            self.client.read(&params.project_path, |graph| {
                let files = sync_folder::target_effective_files(graph, &config.sync, &params.target)?;
                if files.is_empty() {
                    return Ok(format!("No synchronized files for '{}'.", params.target));
                }
                Ok(files.join("\n"))
            })
        });
        reply(result)
    }

    // ------------------------------------------------------------------------
    // Build settings
    // ------------------------------------------------------------------------

    #[tool(description = "List build configurations of the project or a target")]
    async fn list_build_configurations(
        &self,
        Parameters(params): Parameters<ConfigurationsParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.client.read(&params.project_path, |graph| {
            Ok(tools::render_configurations(&settings::list_build_configurations(
                graph,
                params.target.as_deref(),
            )?))
        }))
    }

    #[tool(description = "Show build settings of the project or a target, per configuration")]
    async fn get_build_settings(
        &self,
        Parameters(params): Parameters<GetBuildSettingsParams>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.client.read(&params.project_path, |graph| {
            tools::render_settings(&settings::get_build_settings(
                graph,
                params.target.as_deref(),
                params.configuration.as_deref(),
            )?)
        }))
    }

    #[tool(description = "Set a build setting in one or all configurations")]
    async fn set_build_setting(
        &self,
        Parameters(params): Parameters<SetBuildSettingParams>,
    ) -> Result<CallToolResult, McpError> {
        let value = SettingValue::parse(&params.value);
        reply(described(self.client.edit(&params.project_path, |graph| {
            settings::set_build_setting(
                graph,
                params.target.as_deref(),
                &params.key,
                value,
                params.configuration.as_deref(),
            )
        })))
    }
}

#[tool_handler]
impl ServerHandler for PbxGraphServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "pbxgraph MCP Server - Edit Xcode-style project documents: targets, files, groups, \
                 build phases, Swift packages, synchronized folders and build settings. \
                 Every tool takes the path of the project document."
                    .to_string(),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up logging to stderr (stdio is for MCP protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting pbxgraph MCP server...");

    let service = PbxGraphServer::new().serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbxgraph_core::{GraphError, ObjectKind};

    #[test]
    fn test_recoverable_errors_are_tool_results() {
        let result = reply(Err(GraphError::not_found(ObjectKind::Target, "Widget"))).unwrap();
        assert_ne!(result.is_error, Some(true));

        let err = reply(Err(GraphError::Validation("self dependency".into()))).unwrap_err();
        assert!(err.message.contains("self dependency"));
    }

    #[test]
    fn test_target_spec_from_params() {
        let params = CreateTargetParams {
            project_path: "/tmp/Demo.json".into(),
            name: "Widget".into(),
            product_type: "app_extension".into(),
            platform: Some("macOS".into()),
            bundle_identifier: None,
            deployment_target: Some("14.0".into()),
        };
        let spec = target_spec(&params).unwrap();
        assert_eq!(spec.product_type, ProductType::AppExtension);
        assert_eq!(spec.platform, Platform::Macos);
        assert_eq!(spec.deployment_target.as_deref(), Some("14.0"));
    }
}
