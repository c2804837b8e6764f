//! pbxgraph Core Library
//!
//! This crate provides the project graph engine behind pbxgraph:
//! - Typed entity model of an Xcode-style project document
//! - Node store with owned/referenced edges and cascading removal
//! - Name and path based reference resolution
//! - Mutation operations for targets, files, groups, phases, packages and
//!   synchronized folders
//! - Persistence boundary and per-document transactions
//! - Engine configuration

pub mod config;
pub mod error;
pub mod fs_effects;
pub mod graph;
pub mod ops;
pub mod path_utils;
pub mod persist;
mod resolve;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{EngineConfig, SyncConfig, CONFIG_FILE_NAME};
pub use error::{GraphError, Result};
pub use graph::ProjectGraph;
pub use ops::{Mutation, Outcome};
pub use persist::{GraphStore, JsonGraphStore, MemoryGraphStore};
pub use resolve::canonical_url;
pub use session::Workspace;
pub use store::NodeStore;
pub use types::{
    CopyDestination, ObjectId, ObjectKind, PhaseKind, PhaseVariant, Platform, ProductType,
    SettingValue, VersionRequirement,
};
pub use path_utils::{normalize_path, path_to_string, project_relative};
