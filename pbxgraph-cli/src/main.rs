//! pbxgraph CLI
//!
//! Command-line interface for creating, inspecting and checking project documents.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pbxgraph_core::ops::{files, groups, packages, settings, sync_folder, targets};
use pbxgraph_core::{EngineConfig, ProjectGraph, SettingValue, Workspace};
use serde::Serialize;

/// Document looked up in the current directory when `--project` is not given
const DEFAULT_DOCUMENT: &str = "project.pbxgraph.json";

#[derive(Parser)]
#[command(name = "pbxgraph")]
#[command(about = "Xcode-style project graph editor")]
#[command(version)]
struct Cli {
    /// Project document (default: ./project.pbxgraph.json)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Print listings as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty project document
    Init {
        /// Project name (default: name of the document's directory)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List targets
    Targets,

    /// List files in the group tree
    Files {
        /// Only files built by this target
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Show the group tree
    Groups,

    /// List Swift package references
    Packages,

    /// List synchronized folders
    SyncFolders,

    /// List the files a target gets from synchronized folders
    SyncFiles {
        /// Target name
        target: String,
    },

    /// List build configurations
    Configs {
        /// Target name (default: project level)
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Show build settings
    Settings {
        /// Target name (default: project level)
        #[arg(short, long)]
        target: Option<String>,

        /// Configuration name (default: all)
        #[arg(short, long)]
        configuration: Option<String>,
    },

    /// Set a build setting
    SetSetting {
        /// Setting name, e.g. SWIFT_VERSION
        key: String,

        /// Value; a JSON array of strings is stored as a list
        value: String,

        /// Target name (default: project level)
        #[arg(short, long)]
        target: Option<String>,

        /// Configuration name (default: all)
        #[arg(short, long)]
        configuration: Option<String>,
    },

    /// Check the document for broken references
    Validate,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let document = cli
        .project
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCUMENT));
    let workspace = Workspace::new();

    match cli.command {
        Commands::Init { name } => cmd_init(&workspace, &document, name),
        Commands::Targets => {
            let rows = read(&workspace, &document, targets::list_targets)?;
            print_rows(cli.json, &rows, |t| {
                let product = t.product.as_deref().unwrap_or("-");
                format!("{:<24} {:<28} {}", t.name, t.product_type.to_string(), product)
            })
        }
        Commands::Files { target } => {
            let rows = read(&workspace, &document, |g| files::list_files(g, target.as_deref()))?;
            print_rows(cli.json, &rows, |f| {
                if f.phases.is_empty() {
                    f.path.clone()
                } else {
                    format!("{}  ({})", f.path, f.phases.join(", "))
                }
            })
        }
        Commands::Groups => {
            let rows = read(&workspace, &document, groups::list_groups)?;
            print_rows(cli.json, &rows, |g| {
                let name = g.path.rsplit('/').next().unwrap_or(&g.path);
                let marker = if g.synchronized { " [synchronized]" } else { "" };
                format!("{}{}/{}", "  ".repeat(g.depth), name, marker)
            })
        }
        Commands::Packages => {
            let rows = read(&workspace, &document, packages::list_swift_packages)?;
            print_rows(cli.json, &rows, |p| {
                let requirement = p.requirement.as_deref().unwrap_or("local");
                format!("{:<24} {:<40} {}", p.name, p.location, requirement)
            })
        }
        Commands::SyncFolders => {
            let rows = read(&workspace, &document, sync_folder::list_sync_folders)?;
            print_rows(cli.json, &rows, |f| {
                let excluded: usize = f.exceptions.iter().map(|e| e.files.len()).sum();
                format!("{:<32} {}  ({} excluded)", f.path, f.targets.join(", "), excluded)
            })
        }
        Commands::SyncFiles { target } => {
            let config = EngineConfig::discover(&document).context("Failed to load config")?;
            let rows = read(&workspace, &document, |g| {
                sync_folder::target_effective_files(g, &config.sync, &target)
            })?;
            print_rows(cli.json, &rows, |f| f.clone())
        }
        Commands::Configs { target } => {
            let rows = read(&workspace, &document, |g| {
                settings::list_build_configurations(g, target.as_deref())
            })?;
            print_rows(cli.json, &rows, |c| {
                let default = if c.is_default { " (default)" } else { "" };
                format!("{}{}  {} setting(s)", c.name, default, c.setting_count)
            })
        }
        Commands::Settings {
            target,
            configuration,
        } => {
            let rows = read(&workspace, &document, |g| {
                settings::get_build_settings(g, target.as_deref(), configuration.as_deref())
            })?;
            // Settings are nested; always JSON
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        }
        Commands::SetSetting {
            key,
            value,
            target,
            configuration,
        } => {
            let outcome = workspace
                .edit(&document, |graph| {
                    settings::set_build_setting(
                        graph,
                        target.as_deref(),
                        &key,
                        SettingValue::parse(&value),
                        configuration.as_deref(),
                    )
                })
                .with_context(|| format!("Failed to set {} in {}", key, document.display()))?;
            println!("{}", outcome);
            Ok(())
        }
        Commands::Validate => cmd_validate(&workspace, &document),
    }
}

/// Create a new document next to the current directory or at `--project`
fn cmd_init(workspace: &Workspace, document: &Path, name: Option<String>) -> Result<()> {
    let directory = match document.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let name = name.unwrap_or_else(|| {
        directory
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "MyApp".to_string())
    });

    tracing::info!("Initializing project: {}", name);

    let graph = ProjectGraph::new(&name).with_source_root(&directory);
    workspace
        .create(document, &graph)
        .with_context(|| format!("Failed to create {}", document.display()))?;

    println!("Initialized project '{}' at {}", name, document.display());
    println!("\nNext steps:");
    println!("  1. Start the MCP server: pbxgraph-mcp");
    println!("  2. Add targets, files and packages through its tools");
    println!("  3. Run: pbxgraph validate");
    Ok(())
}

fn cmd_validate(workspace: &Workspace, document: &Path) -> Result<()> {
    let violations = read(workspace, document, |graph| Ok(graph.violations()))?;
    if violations.is_empty() {
        println!("{} is valid.", document.display());
        return Ok(());
    }
    for violation in &violations {
        println!("  - {}", violation);
    }
    bail!("{} problem(s) found in {}", violations.len(), document.display())
}

fn read<R>(
    workspace: &Workspace,
    document: &Path,
    f: impl FnOnce(&ProjectGraph) -> pbxgraph_core::Result<R>,
) -> Result<R> {
    workspace
        .read(document, f)
        .with_context(|| format!("Failed to read {}", document.display()))
}

fn print_rows<T: Serialize>(json: bool, rows: &[T], line: impl Fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("(none)");
    }
    for row in rows {
        println!("{}", line(row));
    }
    Ok(())
}
