//! Target lifecycle: create, duplicate, rename, remove, list

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::{attach_child, check_name, dependencies, purge, staged, Outcome};
use crate::config::EngineConfig;
use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::types::{
    BuildFile, BuildPhase, BuildSettings, Configuration, ConfigurationList, ContainerItemProxy,
    Dependency, FileReference, Group, ObjectId, ObjectKind, PackageProduct, PhaseKind, Platform,
    ProductType, ProxyType, SettingValue, SourceTree, Target,
};

/// Parameters of a new target
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub name: String,
    pub product_type: ProductType,
    pub platform: Platform,
    /// Defaults to `<bundle_id_prefix>.<name>`
    pub bundle_identifier: Option<String>,
    /// Defaults to the configured deployment target of the platform
    pub deployment_target: Option<String>,
}

impl TargetSpec {
    pub fn new(name: impl Into<String>, product_type: ProductType) -> Self {
        Self {
            name: name.into(),
            product_type,
            platform: Platform::default(),
            bundle_identifier: None,
            deployment_target: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}

/// Row of [`list_targets`]
#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    pub name: String,
    pub product_name: String,
    pub product_type: ProductType,
    pub product: Option<String>,
    pub build_phases: Vec<String>,
    pub dependencies: Vec<String>,
    pub package_products: Vec<String>,
    pub synchronized_folders: Vec<String>,
}

fn bundle_id_regex() -> &'static Regex {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    INVALID.get_or_init(|| Regex::new(r"[^A-Za-z0-9.-]").unwrap())
}

/// Bundle identifiers only allow alphanumerics, `-` and `.`
pub fn bundle_identifier_for(prefix: &str, name: &str) -> String {
    let segment = bundle_id_regex().replace_all(name, "-");
    format!("{}.{}", prefix.trim_end_matches('.'), segment)
}

fn target_settings(config: &EngineConfig, spec: &TargetSpec) -> BuildSettings {
    let mut settings = BuildSettings::new();
    let bundle_id = spec
        .bundle_identifier
        .clone()
        .unwrap_or_else(|| bundle_identifier_for(&config.bundle_id_prefix, &spec.name));
    let deployment_target = spec
        .deployment_target
        .clone()
        .unwrap_or_else(|| config.deployment_target(spec.platform).to_string());

    settings.insert("PRODUCT_NAME".into(), spec.name.clone().into());
    settings.insert("PRODUCT_BUNDLE_IDENTIFIER".into(), bundle_id.into());
    settings.insert("SDKROOT".into(), spec.platform.sdk_root().into());
    settings.insert(
        spec.platform.deployment_target_key().into(),
        deployment_target.into(),
    );
    if let Some(family) = spec.platform.device_family() {
        settings.insert("TARGETED_DEVICE_FAMILY".into(), family.into());
    }
    settings.insert("SWIFT_VERSION".into(), config.swift_version.clone().into());
    settings.insert("CODE_SIGN_STYLE".into(), "Automatic".into());
    if spec.product_type.has_info_plist() {
        settings.insert(
            "INFOPLIST_FILE".into(),
            format!("{}/Info.plist", spec.name).into(),
        );
    }

    match spec.product_type {
        ProductType::Application => {
            settings.insert("ASSETCATALOG_COMPILER_APPICON_NAME".into(), "AppIcon".into());
            settings.insert(
                "LD_RUNPATH_SEARCH_PATHS".into(),
                SettingValue::Array(vec![
                    "$(inherited)".into(),
                    "@executable_path/Frameworks".into(),
                ]),
            );
        }
        ProductType::Framework | ProductType::StaticFramework => {
            settings.insert("DEFINES_MODULE".into(), "YES".into());
            settings.insert("SKIP_INSTALL".into(), "YES".into());
        }
        ProductType::AppExtension | ProductType::ExtensionKitExtension => {
            settings.insert("SKIP_INSTALL".into(), "YES".into());
        }
        _ => {}
    }
    settings
}

fn new_configuration_list(graph: &mut ProjectGraph, settings: &BuildSettings) -> ObjectId {
    let configurations = ["Debug", "Release"]
        .iter()
        .map(|name| {
            graph.objects.insert(Configuration {
                name: name.to_string(),
                build_settings: settings.clone(),
            })
        })
        .collect();
    graph.objects.insert(ConfigurationList {
        configurations,
        default_configuration_name: "Release".to_string(),
    })
}

fn new_product_reference(graph: &mut ProjectGraph, product_type: ProductType, product_name: &str) -> Result<ObjectId> {
    let product = graph.objects.insert(FileReference {
        name: None,
        path: product_type.product_file_name(product_name),
        source_tree: SourceTree::BuiltProductsDir,
        last_known_file_type: None,
        explicit_file_type: Some(product_type.info().file_type.to_string()),
    });
    let products = graph.products_group()?;
    attach_child(graph, &products, product.clone())?;
    Ok(product)
}

/// Create the target's folder group under the main group. A group of that
/// name that already exists (built-in or user made) is left to its owner and
/// the target gets no folder group.
fn new_target_group(graph: &mut ProjectGraph, name: &str) -> Result<Option<ObjectId>> {
    let main = graph.main_group()?;
    if graph.child_group(&main, name).is_some() {
        tracing::debug!("Group {} already exists, target gets no folder group", name);
        return Ok(None);
    }
    let group = graph.objects.insert(Group {
        path: Some(name.to_string()),
        ..Default::default()
    });
    attach_child(graph, &main, group.clone())?;
    Ok(Some(group))
}

fn ensure_unused(graph: &ProjectGraph, name: &str) -> Result<()> {
    if graph.find_target(name).is_ok() {
        return Err(GraphError::already_exists(ObjectKind::Target, name));
    }
    Ok(())
}

pub fn create_target(
    graph: &mut ProjectGraph,
    config: &EngineConfig,
    spec: &TargetSpec,
) -> Result<Outcome> {
    check_name(ObjectKind::Target, &spec.name)?;
    ensure_unused(graph, &spec.name)?;

    staged(graph, |graph| {
        let settings = target_settings(config, spec);
        let build_configuration_list = new_configuration_list(graph, &settings);
        let build_phases = [PhaseKind::Sources, PhaseKind::Resources, PhaseKind::Frameworks]
            .into_iter()
            .map(|kind| graph.objects.insert(BuildPhase::new(kind)))
            .collect();
        let product = new_product_reference(graph, spec.product_type, &spec.name)?;
        let folder_group = new_target_group(graph, &spec.name)?;

        let target = graph.objects.insert(Target {
            name: spec.name.clone(),
            product_name: spec.name.clone(),
            product_type: spec.product_type,
            build_configuration_list,
            build_phases,
            dependencies: Vec::new(),
            package_product_dependencies: Vec::new(),
            product_reference: Some(product),
            synchronized_groups: Vec::new(),
            folder_group,
        });
        graph.project_mut()?.targets.push(target);

        tracing::info!("Created target {} ({})", spec.name, spec.product_type);
        Ok(Outcome::applied(format!(
            "Created target '{}' ({}, {})",
            spec.name, spec.product_type, spec.platform
        )))
    })
}

pub fn list_targets(graph: &ProjectGraph) -> Result<Vec<TargetSummary>> {
    let mut rows = Vec::new();
    for (_, target) in graph.targets()? {
        let build_phases = target
            .build_phases
            .iter()
            .filter_map(|id| graph.objects.get::<BuildPhase>(id).ok())
            .map(|phase| format!("{} ({} files)", phase.display_name(), phase.files.len()))
            .collect();
        let dependencies = target
            .dependencies
            .iter()
            .filter_map(|id| graph.objects.get::<Dependency>(id).ok())
            .map(|dep| dep.name.clone())
            .collect();
        let package_products = target
            .package_product_dependencies
            .iter()
            .filter_map(|id| graph.objects.get::<PackageProduct>(id).ok())
            .map(|product| product.product_name.clone())
            .collect();
        let synchronized_folders = target
            .synchronized_groups
            .iter()
            .map(|id| graph.full_path(id))
            .collect();
        let product = target
            .product_reference
            .as_ref()
            .and_then(|id| graph.objects.get::<FileReference>(id).ok())
            .map(|file| file.path.clone());

        rows.push(TargetSummary {
            name: target.name.clone(),
            product_name: target.product_name.clone(),
            product_type: target.product_type,
            product,
            build_phases,
            dependencies,
            package_products,
            synchronized_folders,
        });
    }
    Ok(rows)
}

/// Replace `old` in one path segment: the whole segment, or a prefix followed
/// by `.`, `-` or `_` (`App-Info.plist`, `App.app`).
fn rename_segment(segment: &str, old: &str, new: &str) -> Option<String> {
    if segment == old {
        return Some(new.to_string());
    }
    segment
        .strip_prefix(old)
        .filter(|rest| rest.starts_with(['.', '-', '_']))
        .map(|rest| format!("{}{}", new, rest))
}

fn rename_segments(value: &str, separator: char, old: &str, new: &str) -> String {
    value
        .split(separator)
        .map(|segment| rename_segment(segment, old, new).unwrap_or_else(|| segment.to_string()))
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

fn rename_setting(settings: &mut BuildSettings, key: &str, old: &str, new: &str) {
    if let Some(value) = settings.get_mut(key) {
        if value.as_str() == Some(old) {
            *value = SettingValue::from(new);
        }
    }
}

fn rewrite_path_setting(settings: &mut BuildSettings, key: &str, separator: char, old: &str, new: &str) -> bool {
    match settings.get_mut(key) {
        Some(SettingValue::String(value)) => {
            let rewritten = rename_segments(value, separator, old, new);
            let changed = rewritten != *value;
            *value = rewritten;
            changed
        }
        _ => false,
    }
}

/// Rename a target and every field derived from its name.
///
/// Touches the target and product name, PRODUCT_NAME and PRODUCT_MODULE_NAME
/// values equal to the old name, INFOPLIST_FILE path segments, dependency names
/// and proxy info in other targets, the product reference and the target's
/// folder group. Either all of it changes or none.
pub fn rename_target(graph: &mut ProjectGraph, old: &str, new: &str) -> Result<Outcome> {
    if old == new {
        return Ok(Outcome::unchanged(format!("Target is already named '{}'", new)));
    }
    check_name(ObjectKind::Target, new)?;
    let id = graph.find_target(old)?;
    ensure_unused(graph, new)?;

    staged(graph, |graph| {
        let target = graph.objects.get_mut::<Target>(&id)?;
        target.name = new.to_string();
        if target.product_name == old {
            target.product_name = new.to_string();
        }
        let list = target.build_configuration_list.clone();
        let product = target.product_reference.clone();

        let configurations: Vec<ObjectId> = graph
            .configurations(&list)?
            .into_iter()
            .map(|(config_id, _)| config_id)
            .collect();
        for config_id in configurations {
            let settings = &mut graph.objects.get_mut::<Configuration>(&config_id)?.build_settings;
            rename_setting(settings, "PRODUCT_NAME", old, new);
            rename_setting(settings, "PRODUCT_MODULE_NAME", old, new);
            rewrite_path_setting(settings, "INFOPLIST_FILE", '/', old, new);
        }

        let edges: Vec<ObjectId> = graph
            .objects
            .iter::<Dependency>()
            .filter(|(_, dep)| dep.target == id)
            .map(|(edge, _)| edge.clone())
            .collect();
        for edge in edges {
            let dep = graph.objects.get_mut::<Dependency>(&edge)?;
            if dep.name == old {
                dep.name = new.to_string();
            }
            let proxy = dep.target_proxy.clone();
            let proxy = graph.objects.get_mut::<ContainerItemProxy>(&proxy)?;
            if proxy.remote_info == old {
                proxy.remote_info = new.to_string();
            }
        }

        if let Some(product) = product {
            let file = graph.objects.get_mut::<FileReference>(&product)?;
            file.path = rename_segments(&file.path, '/', old, new);
            if let Some(name) = file.name.as_mut() {
                *name = rename_segments(name, '/', old, new);
            }
        }

        let main = graph.main_group()?;
        let folder = graph
            .target_folder_group(&id)
            .filter(|_| graph.child_group(&main, new).is_none());
        if let Some(folder) = folder {
            let group = graph.objects.get_mut::<Group>(&folder)?;
            if group.name.as_deref() == Some(old) {
                group.name = Some(new.to_string());
            }
            if group.path.as_deref() == Some(old) {
                group.path = Some(new.to_string());
            }
        }

        tracing::info!("Renamed target {} -> {}", old, new);
        Ok(Outcome::applied(format!("Renamed target '{}' to '{}'", old, new)))
    })
}

/// Remove a target and everything that only exists because of it
pub fn remove_target(graph: &mut ProjectGraph, name: &str) -> Result<Outcome> {
    let id = graph.find_target(name)?;

    staged(graph, |graph| {
        let product = graph.target(&id)?.product_reference.clone();
        let folder = graph.target_folder_group(&id);

        let edges = dependencies::remove_dependencies_targeting(graph, &id)?;
        let mut removed = purge(graph, &id)?;
        if let Some(product) = product.filter(|p| graph.objects.contains(p)) {
            removed += purge(graph, &product)?;
        }
        if let Some(folder) = folder.filter(|f| graph.objects.contains(f)) {
            removed += purge(graph, &folder)?;
        }

        tracing::info!("Removed target {} ({} objects)", name, removed + edges);
        let mut message = format!("Removed target '{}'", name);
        if edges > 0 {
            message.push_str(&format!(" and {} dependency edge(s) pointing at it", edges));
        }
        Ok(Outcome::applied(message))
    })
}

/// Copy a target under a new name.
///
/// Build files are copied and keep pointing at the same file references;
/// dependencies get fresh proxies; synchronized folder membership is not
/// carried over.
pub fn duplicate_target(graph: &mut ProjectGraph, source: &str, new_name: &str) -> Result<Outcome> {
    check_name(ObjectKind::Target, new_name)?;
    let source_id = graph.find_target(source)?;
    ensure_unused(graph, new_name)?;

    staged(graph, |graph| {
        let original = graph.target(&source_id)?.clone();

        let mut configurations = Vec::new();
        let default_name = graph
            .objects
            .get::<ConfigurationList>(&original.build_configuration_list)?
            .default_configuration_name
            .clone();
        for (_, configuration) in graph.configurations(&original.build_configuration_list)? {
            let mut settings = configuration.build_settings.clone();
            rename_setting(&mut settings, "PRODUCT_NAME", source, new_name);
            rename_setting(&mut settings, "PRODUCT_MODULE_NAME", source, new_name);
            rewrite_path_setting(&mut settings, "INFOPLIST_FILE", '/', source, new_name);
            let bundle_segment = bundle_id_regex().replace_all(new_name, "-").into_owned();
            if !rewrite_path_setting(&mut settings, "PRODUCT_BUNDLE_IDENTIFIER", '.', source, &bundle_segment) {
                if let Some(SettingValue::String(bundle_id)) = settings.get_mut("PRODUCT_BUNDLE_IDENTIFIER") {
                    bundle_id.push('.');
                    bundle_id.push_str(&bundle_segment);
                }
            }
            configurations.push(Configuration {
                name: configuration.name.clone(),
                build_settings: settings,
            });
        }
        let configurations = configurations
            .into_iter()
            .map(|c| graph.objects.insert(c))
            .collect();
        let build_configuration_list = graph.objects.insert(ConfigurationList {
            configurations,
            default_configuration_name: default_name,
        });

        let mut products: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut package_product_dependencies = Vec::new();
        for product_id in &original.package_product_dependencies {
            let product = graph.objects.get::<PackageProduct>(product_id)?.clone();
            let copy = graph.objects.insert(product);
            products.insert(product_id.clone(), copy.clone());
            package_product_dependencies.push(copy);
        }

        let mut build_phases = Vec::new();
        for phase_id in &original.build_phases {
            let phase = graph.objects.get::<BuildPhase>(phase_id)?.clone();
            let mut files = Vec::new();
            for build_file_id in &phase.files {
                let mut build_file: BuildFile = graph.objects.get::<BuildFile>(build_file_id)?.clone();
                if let Some(product) = build_file.product_ref.as_ref().and_then(|p| products.get(p)) {
                    build_file.product_ref = Some(product.clone());
                }
                files.push(graph.objects.insert(build_file));
            }
            build_phases.push(graph.objects.insert(BuildPhase { files, ..phase }));
        }

        let root = graph.root_object.clone();
        let mut dependencies = Vec::new();
        for dep_id in &original.dependencies {
            let dep = graph.objects.get::<Dependency>(dep_id)?.clone();
            let target_proxy = graph.objects.insert(ContainerItemProxy {
                container_portal: root.clone(),
                proxy_type: ProxyType::NativeTarget,
                remote_global_id: dep.target.clone(),
                remote_info: dep.name.clone(),
            });
            dependencies.push(graph.objects.insert(Dependency {
                name: dep.name,
                target: dep.target,
                target_proxy,
            }));
        }

        let product_name = if original.product_name == source {
            new_name.to_string()
        } else {
            original.product_name.clone()
        };
        let product_reference = if original.product_reference.is_some() {
            Some(new_product_reference(graph, original.product_type, &product_name)?)
        } else {
            None
        };
        let folder_group = new_target_group(graph, new_name)?;

        let copy = graph.objects.insert(Target {
            name: new_name.to_string(),
            product_name,
            product_type: original.product_type,
            build_configuration_list,
            build_phases,
            dependencies,
            package_product_dependencies,
            product_reference,
            synchronized_groups: Vec::new(),
            folder_group,
        });
        graph.project_mut()?.targets.push(copy);

        tracing::info!("Duplicated target {} as {}", source, new_name);
        Ok(Outcome::applied(format!(
            "Duplicated target '{}' as '{}'",
            source, new_name
        )))
    })
}
