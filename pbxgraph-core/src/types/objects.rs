//! Entity structs stored in the node store
//!
//! Ownership is single-direction: a parent lists the ids of the children it owns,
//! and children never point back at their parent. Every other link is a non-owning
//! reference that must never dangle. [`Object::owned`] and [`Object::references`]
//! expose those two edge sets so the store can cascade removals and find referrers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{BuildSettings, ObjectId, PhaseKind, ProductType, SettingValue, VersionRequirement};

/// Discriminant of [`Object`], used for iteration and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Project,
    Target,
    Group,
    SyncGroup,
    ExceptionSet,
    FileReference,
    BuildFile,
    BuildPhase,
    ConfigurationList,
    Configuration,
    Dependency,
    ContainerItemProxy,
    RemotePackage,
    LocalPackage,
    PackageProduct,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ObjectKind::Project => "Project",
            ObjectKind::Target => "Target",
            ObjectKind::Group => "Group",
            ObjectKind::SyncGroup => "Synchronized folder",
            ObjectKind::ExceptionSet => "Exception set",
            ObjectKind::FileReference => "File",
            ObjectKind::BuildFile => "Build file",
            ObjectKind::BuildPhase => "Build phase",
            ObjectKind::ConfigurationList => "Configuration list",
            ObjectKind::Configuration => "Build configuration",
            ObjectKind::Dependency => "Dependency",
            ObjectKind::ContainerItemProxy => "Container item proxy",
            ObjectKind::RemotePackage => "Swift package",
            ObjectKind::LocalPackage => "Local Swift package",
            ObjectKind::PackageProduct => "Package product",
        };
        f.write_str(label)
    }
}

/// Where a path is anchored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTree {
    #[default]
    #[serde(rename = "<group>")]
    Group,
    #[serde(rename = "<absolute>")]
    Absolute,
    #[serde(rename = "SOURCE_ROOT")]
    SourceRoot,
    #[serde(rename = "BUILT_PRODUCTS_DIR")]
    BuiltProductsDir,
    #[serde(rename = "SDKROOT")]
    SdkRoot,
    #[serde(rename = "DEVELOPER_DIR")]
    DeveloperDir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub main_group: ObjectId,
    /// Products group, a child of the main group
    pub products_group: ObjectId,
    pub build_configuration_list: ObjectId,
    #[serde(default)]
    pub targets: Vec<ObjectId>,
    #[serde(default)]
    pub remote_packages: Vec<ObjectId>,
    #[serde(default)]
    pub local_packages: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub name: String,
    pub product_name: String,
    pub product_type: ProductType,
    pub build_configuration_list: ObjectId,
    #[serde(default)]
    pub build_phases: Vec<ObjectId>,
    #[serde(default)]
    pub dependencies: Vec<ObjectId>,
    #[serde(default)]
    pub package_product_dependencies: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_reference: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synchronized_groups: Vec<ObjectId>,
    /// Group created for the target under the main group, if it made one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_group: Option<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub source_tree: SourceTree,
    #[serde(default)]
    pub children: Vec<ObjectId>,
}

impl Group {
    pub fn named(name: impl Into<String>) -> Self {
        Group {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Name shown in the navigator: the name, else the last path component
    pub fn display_name(&self) -> &str {
        if let Some(name) = &self.name {
            return name;
        }
        self.path
            .as_deref()
            .map(|p| p.rsplit('/').next().unwrap_or(p))
            .unwrap_or("")
    }

    /// Whether a path component addresses this group (by name or by path)
    pub fn matches(&self, component: &str) -> bool {
        self.name.as_deref() == Some(component) || self.path.as_deref() == Some(component)
    }
}

/// A group bound to a real directory whose files are implicitly members of
/// every target that references it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncGroup {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub source_tree: SourceTree,
    #[serde(default)]
    pub exceptions: Vec<ObjectId>,
}

/// Per-target membership exclusions of a synchronized folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionSet {
    pub target: ObjectId,
    #[serde(default)]
    pub membership_exceptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: String,
    #[serde(default)]
    pub source_tree: SourceTree,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_file_type: Option<String>,
}

impl FileReference {
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.file_name())
    }
}

/// Join record attaching one file (or package product) to one build phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_ref: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_ref: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, SettingValue>,
}

impl BuildFile {
    pub fn for_file(file_ref: ObjectId) -> Self {
        BuildFile {
            file_ref: Some(file_ref),
            ..Default::default()
        }
    }

    pub fn for_product(product_ref: ObjectId) -> Self {
        BuildFile {
            product_ref: Some(product_ref),
            ..Default::default()
        }
    }

    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        if !attributes.is_empty() {
            self.settings.insert(
                "ATTRIBUTES".to_string(),
                SettingValue::Array(attributes.iter().map(|a| a.to_string()).collect()),
            );
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPhase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: PhaseKind,
    /// Build files in build order
    #[serde(default)]
    pub files: Vec<ObjectId>,
}

impl BuildPhase {
    pub fn new(kind: PhaseKind) -> Self {
        BuildPhase {
            name: None,
            kind,
            files: Vec::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.kind.variant().default_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationList {
    #[serde(default)]
    pub configurations: Vec<ObjectId>,
    pub default_configuration_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub name: String,
    #[serde(default)]
    pub build_settings: BuildSettings,
}

/// Directed "depends on" edge from the owning target to `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub name: String,
    pub target: ObjectId,
    pub target_proxy: ObjectId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProxyType {
    #[default]
    NativeTarget,
    Reference,
}

/// Indirection record behind a dependency edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerItemProxy {
    pub container_portal: ObjectId,
    #[serde(default)]
    pub proxy_type: ProxyType,
    pub remote_global_id: ObjectId,
    pub remote_info: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePackage {
    pub repository_url: String,
    pub requirement: VersionRequirement,
}

impl RemotePackage {
    /// Package name derived from the repository URL
    pub fn name(&self) -> &str {
        let trimmed = self.repository_url.trim_end_matches('/');
        let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
        last.strip_suffix(".git").unwrap_or(last)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPackage {
    pub relative_path: String,
}

impl LocalPackage {
    /// Package name by convention: the last path component
    pub fn name(&self) -> &str {
        let trimmed = self.relative_path.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }
}

/// Links a target to one product of a package. Local package products carry
/// no `package` and are matched by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<ObjectId>,
    pub product_name: String,
}

/// Every entity kind, tagged with the project-file `isa`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "isa")]
pub enum Object {
    #[serde(rename = "PBXProject")]
    Project(Project),
    #[serde(rename = "PBXNativeTarget")]
    Target(Target),
    #[serde(rename = "PBXGroup")]
    Group(Group),
    #[serde(rename = "PBXFileSystemSynchronizedRootGroup")]
    SyncGroup(SyncGroup),
    #[serde(rename = "PBXFileSystemSynchronizedBuildFileExceptionSet")]
    ExceptionSet(ExceptionSet),
    #[serde(rename = "PBXFileReference")]
    FileReference(FileReference),
    #[serde(rename = "PBXBuildFile")]
    BuildFile(BuildFile),
    #[serde(rename = "PBXBuildPhase")]
    BuildPhase(BuildPhase),
    #[serde(rename = "XCConfigurationList")]
    ConfigurationList(ConfigurationList),
    #[serde(rename = "XCBuildConfiguration")]
    Configuration(Configuration),
    #[serde(rename = "PBXTargetDependency")]
    Dependency(Dependency),
    #[serde(rename = "PBXContainerItemProxy")]
    ContainerItemProxy(ContainerItemProxy),
    #[serde(rename = "XCRemoteSwiftPackageReference")]
    RemotePackage(RemotePackage),
    #[serde(rename = "XCLocalSwiftPackageReference")]
    LocalPackage(LocalPackage),
    #[serde(rename = "XCSwiftPackageProductDependency")]
    PackageProduct(PackageProduct),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Project(_) => ObjectKind::Project,
            Object::Target(_) => ObjectKind::Target,
            Object::Group(_) => ObjectKind::Group,
            Object::SyncGroup(_) => ObjectKind::SyncGroup,
            Object::ExceptionSet(_) => ObjectKind::ExceptionSet,
            Object::FileReference(_) => ObjectKind::FileReference,
            Object::BuildFile(_) => ObjectKind::BuildFile,
            Object::BuildPhase(_) => ObjectKind::BuildPhase,
            Object::ConfigurationList(_) => ObjectKind::ConfigurationList,
            Object::Configuration(_) => ObjectKind::Configuration,
            Object::Dependency(_) => ObjectKind::Dependency,
            Object::ContainerItemProxy(_) => ObjectKind::ContainerItemProxy,
            Object::RemotePackage(_) => ObjectKind::RemotePackage,
            Object::LocalPackage(_) => ObjectKind::LocalPackage,
            Object::PackageProduct(_) => ObjectKind::PackageProduct,
        }
    }

    /// Children whose lifetime this entity owns
    pub fn owned(&self) -> Vec<&ObjectId> {
        match self {
            Object::Project(p) => {
                let mut ids = vec![&p.main_group, &p.build_configuration_list];
                ids.extend(&p.targets);
                ids.extend(&p.remote_packages);
                ids.extend(&p.local_packages);
                ids
            }
            Object::Target(t) => {
                let mut ids = vec![&t.build_configuration_list];
                ids.extend(&t.build_phases);
                ids.extend(&t.dependencies);
                ids.extend(&t.package_product_dependencies);
                ids
            }
            Object::Group(g) => g.children.iter().collect(),
            Object::SyncGroup(g) => g.exceptions.iter().collect(),
            Object::BuildPhase(p) => p.files.iter().collect(),
            Object::ConfigurationList(l) => l.configurations.iter().collect(),
            Object::Dependency(d) => vec![&d.target_proxy],
            Object::ExceptionSet(_)
            | Object::FileReference(_)
            | Object::BuildFile(_)
            | Object::Configuration(_)
            | Object::ContainerItemProxy(_)
            | Object::RemotePackage(_)
            | Object::LocalPackage(_)
            | Object::PackageProduct(_) => Vec::new(),
        }
    }

    /// Every outgoing link: owned children plus non-owning references
    pub fn references(&self) -> Vec<&ObjectId> {
        let mut ids = self.owned();
        match self {
            Object::Project(p) => ids.push(&p.products_group),
            Object::Target(t) => {
                ids.extend(t.product_reference.iter());
                ids.extend(&t.synchronized_groups);
                ids.extend(t.folder_group.iter());
            }
            Object::ExceptionSet(e) => ids.push(&e.target),
            Object::BuildFile(b) => {
                ids.extend(b.file_ref.iter());
                ids.extend(b.product_ref.iter());
            }
            Object::Dependency(d) => ids.push(&d.target),
            Object::ContainerItemProxy(p) => {
                ids.push(&p.container_portal);
                ids.push(&p.remote_global_id);
            }
            Object::PackageProduct(p) => ids.extend(p.package.iter()),
            _ => {}
        }
        ids
    }

    /// Drop every list entry or optional link pointing at `id`. Returns false
    /// when nothing could be removed (absent, or held by a required field).
    pub fn unlink(&mut self, id: &ObjectId) -> bool {
        fn strip(list: &mut Vec<ObjectId>, id: &ObjectId) -> bool {
            let before = list.len();
            list.retain(|entry| entry != id);
            list.len() != before
        }

        match self {
            Object::Project(p) => {
                let a = strip(&mut p.targets, id);
                let b = strip(&mut p.remote_packages, id);
                let c = strip(&mut p.local_packages, id);
                a || b || c
            }
            Object::Target(t) => {
                let mut hit = strip(&mut t.build_phases, id);
                hit |= strip(&mut t.dependencies, id);
                hit |= strip(&mut t.package_product_dependencies, id);
                hit |= strip(&mut t.synchronized_groups, id);
                if t.product_reference.as_ref() == Some(id) {
                    t.product_reference = None;
                    hit = true;
                }
                if t.folder_group.as_ref() == Some(id) {
                    t.folder_group = None;
                    hit = true;
                }
                hit
            }
            Object::Group(g) => strip(&mut g.children, id),
            Object::SyncGroup(g) => strip(&mut g.exceptions, id),
            Object::BuildPhase(p) => strip(&mut p.files, id),
            Object::ConfigurationList(l) => strip(&mut l.configurations, id),
            Object::BuildFile(b) => {
                let mut hit = false;
                if b.file_ref.as_ref() == Some(id) {
                    b.file_ref = None;
                    hit = true;
                }
                if b.product_ref.as_ref() == Some(id) {
                    b.product_ref = None;
                    hit = true;
                }
                hit
            }
            Object::PackageProduct(p) => {
                if p.package.as_ref() == Some(id) {
                    p.package = None;
                    true
                } else {
                    false
                }
            }
            Object::ExceptionSet(_)
            | Object::FileReference(_)
            | Object::Configuration(_)
            | Object::Dependency(_)
            | Object::ContainerItemProxy(_)
            | Object::RemotePackage(_)
            | Object::LocalPackage(_) => false,
        }
    }
}

/// Typed view of an [`Object`] variant
pub trait Entity: Sized {
    const KIND: ObjectKind;

    fn from_object(object: &Object) -> Option<&Self>;
    fn from_object_mut(object: &mut Object) -> Option<&mut Self>;
    fn into_object(self) -> Object;
}

macro_rules! entity {
    ($ty:ident, $variant:ident) => {
        impl Entity for $ty {
            const KIND: ObjectKind = ObjectKind::$variant;

            fn from_object(object: &Object) -> Option<&Self> {
                match object {
                    Object::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_object_mut(object: &mut Object) -> Option<&mut Self> {
                match object {
                    Object::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_object(self) -> Object {
                Object::$variant(self)
            }
        }
    };
}

entity!(Project, Project);
entity!(Target, Target);
entity!(Group, Group);
entity!(SyncGroup, SyncGroup);
entity!(ExceptionSet, ExceptionSet);
entity!(FileReference, FileReference);
entity!(BuildFile, BuildFile);
entity!(BuildPhase, BuildPhase);
entity!(ConfigurationList, ConfigurationList);
entity!(Configuration, Configuration);
entity!(Dependency, Dependency);
entity!(ContainerItemProxy, ContainerItemProxy);
entity!(RemotePackage, RemotePackage);
entity!(LocalPackage, LocalPackage);
entity!(PackageProduct, PackageProduct);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CopyDestination;

    #[test]
    fn test_object_isa_tag() {
        let object = Object::FileReference(FileReference {
            name: None,
            path: "App/ContentView.swift".into(),
            source_tree: SourceTree::Group,
            last_known_file_type: Some("sourcecode.swift".into()),
            explicit_file_type: None,
        });
        let json = serde_json::to_value(&object).unwrap();
        assert_eq!(json["isa"], "PBXFileReference");
        assert_eq!(json["sourceTree"], "<group>");
        assert_eq!(json["lastKnownFileType"], "sourcecode.swift");

        let back: Object = serde_json::from_value(json).unwrap();
        assert_eq!(back, object);
    }

    #[test]
    fn test_build_phase_round_trip() {
        let object = Object::BuildPhase(BuildPhase {
            name: Some("Embed Frameworks".into()),
            kind: PhaseKind::CopyFiles {
                destination: CopyDestination::Frameworks,
                subpath: String::new(),
            },
            files: vec![ObjectId::from("AAAAAAAAAAAAAAAAAAAAAAAA")],
        });
        let json = serde_json::to_string(&object).unwrap();
        let back: Object = serde_json::from_str(&json).unwrap();
        assert_eq!(back, object);
    }

    #[test]
    fn test_references_include_non_owning_links() {
        let build_file = Object::BuildFile(BuildFile::for_file(ObjectId::from("F")));
        assert!(build_file.owned().is_empty());
        assert_eq!(build_file.references(), vec![&ObjectId::from("F")]);
    }

    #[test]
    fn test_unlink_lists_and_optional_links() {
        let child = ObjectId::from("C");
        let mut group = Object::Group(Group {
            children: vec![ObjectId::from("A"), child.clone()],
            ..Default::default()
        });
        assert!(group.unlink(&child));
        assert_eq!(group.owned(), vec![&ObjectId::from("A")]);
        assert!(!group.unlink(&child));

        // Required links cannot be cleared
        let mut dependency = Object::Dependency(Dependency {
            name: "Widget".into(),
            target: child.clone(),
            target_proxy: ObjectId::from("P"),
        });
        assert!(!dependency.unlink(&child));
    }

    #[test]
    fn test_package_names() {
        let remote = RemotePackage {
            repository_url: "https://github.com/Alamofire/Alamofire.git".into(),
            requirement: VersionRequirement::ExactVersion {
                version: "5.8.0".into(),
            },
        };
        assert_eq!(remote.name(), "Alamofire");
        let local = LocalPackage {
            relative_path: "Packages/CoreKit/".into(),
        };
        assert_eq!(local.name(), "CoreKit");
    }

    #[test]
    fn test_group_display_name() {
        let group = Group {
            path: Some("Sources/Models".into()),
            ..Default::default()
        };
        assert_eq!(group.display_name(), "Models");
        assert!(group.matches("Sources/Models"));
        assert!(!group.matches("Models"));
    }
}
