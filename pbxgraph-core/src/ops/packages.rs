//! Swift package references and their product links

use serde::Serialize;

use super::phases::{attach_build_file, ensure_phase};
use super::{purge, staged, Outcome};
use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::path_utils::project_relative;
use crate::types::{
    BuildFile, LocalPackage, ObjectId, PackageProduct, PhaseVariant, RemotePackage, Target,
    VersionRequirement,
};

/// Link `product` of `package` (None for local packages) into a target's
/// Frameworks phase. Returns whether anything changed.
fn link_product(
    graph: &mut ProjectGraph,
    target: &ObjectId,
    package: Option<&ObjectId>,
    product: &str,
) -> Result<bool> {
    let already = graph.target(target)?.package_product_dependencies.iter().any(|id| {
        graph
            .objects
            .get::<PackageProduct>(id)
            .map(|p| p.package.as_ref() == package && p.product_name == product)
            .unwrap_or(false)
    });
    if already {
        return Ok(false);
    }

    let product_id = graph.objects.insert(PackageProduct {
        package: package.cloned(),
        product_name: product.to_string(),
    });
    graph
        .objects
        .get_mut::<Target>(target)?
        .package_product_dependencies
        .push(product_id.clone());
    let phase = ensure_phase(graph, target, PhaseVariant::Frameworks)?;
    attach_build_file(graph, &phase, BuildFile::for_product(product_id))?;
    Ok(true)
}

fn link_products(
    graph: &mut ProjectGraph,
    target: Option<&str>,
    package: Option<&ObjectId>,
    products: &[String],
) -> Result<Vec<String>> {
    let mut linked = Vec::new();
    if products.is_empty() {
        return Ok(linked);
    }
    let target_name = target.ok_or_else(|| {
        GraphError::InvalidArgument("Linking package products requires a target".to_string())
    })?;
    let target_id = graph.find_target(target_name)?;
    for product in products {
        let product = product.trim();
        if product.is_empty() {
            return Err(GraphError::InvalidArgument("Empty package product name".to_string()));
        }
        if link_product(graph, &target_id, package, product)? {
            linked.push(format!("{} -> {}", product, target_name));
        }
    }
    Ok(linked)
}

/// Add a remote package reference and optionally link some of its products
/// into a target. A second add of the same URL reuses the existing reference.
pub fn add_swift_package(
    graph: &mut ProjectGraph,
    url: &str,
    requirement: VersionRequirement,
    products: &[String],
    target: Option<&str>,
) -> Result<Outcome> {
    let url = url.trim();
    if url.is_empty() {
        return Err(GraphError::InvalidArgument("Package URL must not be empty".to_string()));
    }

    staged(graph, |graph| {
        let mut outcomes = Vec::new();
        let package = match graph.find_remote_package(url) {
            Ok(id) => {
                tracing::debug!("Package {} already referenced", url);
                outcomes.push(Outcome::unchanged(format!(
                    "Swift package already exists: {}",
                    url
                )));
                id
            }
            Err(_) => {
                let id = graph.objects.insert(RemotePackage {
                    repository_url: url.to_string(),
                    requirement: requirement.clone(),
                });
                graph.project_mut()?.remote_packages.push(id.clone());
                tracing::info!("Added package {} ({})", url, requirement);
                outcomes.push(Outcome::applied(format!(
                    "Added Swift package {} ({})",
                    url, requirement
                )));
                id
            }
        };

        let linked = link_products(graph, target, Some(&package), products)?;
        if !linked.is_empty() {
            tracing::info!("Linked package products: {}", linked.join(", "));
            outcomes.push(Outcome::applied(format!("Linked {}", linked.join(", "))));
        }
        Ok(Outcome::merge(outcomes))
    })
}

/// Remove a remote package with every product link to it
pub fn remove_swift_package(graph: &mut ProjectGraph, url: &str) -> Result<Outcome> {
    let package = graph.find_remote_package(url)?;
    staged(graph, |graph| {
        let removed = purge(graph, &package)?;
        tracing::info!("Removed package {} ({} objects)", url, removed);
        Ok(Outcome::applied(format!(
            "Removed Swift package {} and {} linked object(s)",
            url,
            removed.saturating_sub(1)
        )))
    })
}

/// Add a local package by directory and optionally link products into a target
pub fn add_local_package(
    graph: &mut ProjectGraph,
    path: &str,
    products: &[String],
    target: Option<&str>,
) -> Result<Outcome> {
    let relative = project_relative(graph.source_root(), path);
    let relative = relative.trim_end_matches('/').to_string();
    if relative.is_empty() {
        return Err(GraphError::InvalidArgument("Package path must not be empty".to_string()));
    }

    staged(graph, |graph| {
        let mut outcomes = Vec::new();
        if graph.find_local_package(&relative).is_ok() {
            outcomes.push(Outcome::unchanged(format!(
                "Local Swift package already exists: {}",
                relative
            )));
        } else {
            let id = graph.objects.insert(LocalPackage {
                relative_path: relative.clone(),
            });
            graph.project_mut()?.local_packages.push(id);
            tracing::info!("Added local package {}", relative);
            outcomes.push(Outcome::applied(format!("Added local Swift package {}", relative)));
        }

        let linked = link_products(graph, target, None, products)?;
        if !linked.is_empty() {
            outcomes.push(Outcome::applied(format!("Linked {}", linked.join(", "))));
        }
        Ok(Outcome::merge(outcomes))
    })
}

/// Product links that belong to a local package: unresolved products named
/// after the package directory
fn local_products(graph: &ProjectGraph, package_name: &str) -> Vec<ObjectId> {
    graph
        .objects
        .iter::<PackageProduct>()
        .filter(|(_, p)| p.package.is_none() && p.product_name == package_name)
        .map(|(id, _)| id.clone())
        .collect()
}

pub fn remove_local_package(graph: &mut ProjectGraph, path: &str) -> Result<Outcome> {
    let package = graph.find_local_package(path)?;
    let name = graph.objects.get::<LocalPackage>(&package)?.name().to_string();
    let products = local_products(graph, &name);

    staged(graph, |graph| {
        for product in &products {
            purge(graph, product)?;
        }
        purge(graph, &package)?;
        tracing::info!("Removed local package {} ({} product links)", path, products.len());
        Ok(Outcome::applied(format!(
            "Removed local Swift package {} and {} product link(s)",
            path,
            products.len()
        )))
    })
}

/// Row of [`list_swift_packages`]
#[derive(Debug, Clone, Serialize)]
pub struct PackageEntry {
    /// `remote` or `local`
    pub kind: &'static str,
    /// Repository URL or relative path
    pub location: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement: Option<String>,
    /// `Product (Target)` links
    pub products: Vec<String>,
}

/// `Product (Target)` labels of the product links accepted by `matches`
fn product_links(
    graph: &ProjectGraph,
    matches: impl Fn(&PackageProduct) -> bool,
) -> Result<Vec<String>> {
    let mut rows = Vec::new();
    for (_, target) in graph.targets()? {
        for id in &target.package_product_dependencies {
            let product = graph.objects.get::<PackageProduct>(id)?;
            if matches(product) {
                rows.push(format!("{} ({})", product.product_name, target.name));
            }
        }
    }
    Ok(rows)
}

pub fn list_swift_packages(graph: &ProjectGraph) -> Result<Vec<PackageEntry>> {
    let project = graph.project()?;
    let mut entries = Vec::new();
    for id in &project.remote_packages {
        let package = graph.objects.get::<RemotePackage>(id)?;
        entries.push(PackageEntry {
            kind: "remote",
            location: package.repository_url.clone(),
            name: package.name().to_string(),
            requirement: Some(package.requirement.to_string()),
            products: product_links(graph, |p| p.package.as_ref() == Some(id))?,
        });
    }
    for id in &project.local_packages {
        let package = graph.objects.get::<LocalPackage>(id)?;
        let name = package.name();
        entries.push(PackageEntry {
            kind: "local",
            location: package.relative_path.clone(),
            name: name.to_string(),
            requirement: None,
            products: product_links(graph, |p| p.package.is_none() && p.product_name == name)?,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::project_with;
    use crate::types::BuildPhase;

    const LOG_URL: &str = "https://github.com/apple/swift-log.git";

    fn from(version: &str) -> VersionRequirement {
        VersionRequirement::UpToNextMajorVersion {
            minimum_version: version.into(),
        }
    }

    #[test]
    fn test_same_package_twice_is_one_node() {
        let mut graph = project_with(&["App"]);
        assert!(add_swift_package(&mut graph, LOG_URL, from("1.5.0"), &[], None)
            .unwrap()
            .is_applied());
        let again = add_swift_package(
            &mut graph,
            "https://github.com/apple/swift-log",
            from("1.5.0"),
            &[],
            None,
        )
        .unwrap();
        assert!(!again.is_applied());
        assert!(again.message().contains("already exists"));
        assert_eq!(graph.objects.iter::<RemotePackage>().count(), 1);
    }

    #[test]
    fn test_link_products_and_remove_package() {
        let mut graph = project_with(&["App"]);
        add_swift_package(&mut graph, LOG_URL, from("1.5.0"), &["Logging".to_string()], Some("App"))
            .unwrap();
        graph.validate().unwrap();

        let app = graph.find_target("App").unwrap();
        assert_eq!(graph.target(&app).unwrap().package_product_dependencies.len(), 1);
        let phase = graph.find_phase(&app, PhaseVariant::Frameworks).unwrap().unwrap();
        assert_eq!(graph.objects.get::<BuildPhase>(&phase).unwrap().files.len(), 1);

        // Linking the same product again changes nothing
        assert!(!add_swift_package(&mut graph, LOG_URL, from("1.5.0"), &["Logging".to_string()], Some("App"))
            .unwrap()
            .is_applied());

        remove_swift_package(&mut graph, LOG_URL).unwrap();
        graph.validate().unwrap();
        assert!(graph.target(&app).unwrap().package_product_dependencies.is_empty());
        assert!(graph.objects.get::<BuildPhase>(&phase).unwrap().files.is_empty());
        assert_eq!(graph.objects.iter::<PackageProduct>().count(), 0);
        assert!(graph.project().unwrap().remote_packages.is_empty());
    }

    #[test]
    fn test_products_need_a_target() {
        let mut graph = project_with(&["App"]);
        assert!(matches!(
            add_swift_package(&mut graph, LOG_URL, from("1.0.0"), &["Logging".to_string()], None),
            Err(GraphError::InvalidArgument(_))
        ));
        // Nothing was committed
        assert!(graph.project().unwrap().remote_packages.is_empty());
    }

    #[test]
    fn test_local_package_lifecycle() {
        let mut graph = project_with(&["App"]);
        add_local_package(&mut graph, "Packages/CoreKit", &["CoreKit".to_string()], Some("App"))
            .unwrap();
        graph.validate().unwrap();
        assert!(!add_local_package(&mut graph, "/work/Demo/Packages/CoreKit/", &[], None)
            .unwrap()
            .is_applied());

        let listed = list_swift_packages(&graph).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, "local");
        assert_eq!(listed[0].products, vec!["CoreKit (App)".to_string()]);

        remove_local_package(&mut graph, "Packages/CoreKit").unwrap();
        graph.validate().unwrap();
        assert_eq!(graph.objects.iter::<PackageProduct>().count(), 0);
        assert!(graph.project().unwrap().local_packages.is_empty());
    }

    #[test]
    fn test_list_remote_packages() {
        let mut graph = project_with(&["App", "Tests"]);
        add_swift_package(&mut graph, LOG_URL, from("1.5.0"), &["Logging".to_string()], Some("App"))
            .unwrap();
        add_swift_package(&mut graph, LOG_URL, from("1.5.0"), &["Logging".to_string()], Some("Tests"))
            .unwrap();
        let listed = list_swift_packages(&graph).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "swift-log");
        assert_eq!(listed[0].requirement.as_deref(), Some("from 1.5.0"));
        assert_eq!(listed[0].products, vec!["Logging (App)", "Logging (Tests)"]);
    }
}
