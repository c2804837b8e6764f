//! Build configurations and build settings
//!
//! Without a target these operate on the project-level configuration list.

use serde::Serialize;

use super::Outcome;
use crate::error::{GraphError, Result};
use crate::graph::ProjectGraph;
use crate::types::{BuildSettings, Configuration, ConfigurationList, ObjectId, ObjectKind, SettingValue};

fn configuration_list(graph: &ProjectGraph, target: Option<&str>) -> Result<ObjectId> {
    match target {
        Some(name) => {
            let id = graph.find_target(name)?;
            Ok(graph.target(&id)?.build_configuration_list.clone())
        }
        None => Ok(graph.project()?.build_configuration_list.clone()),
    }
}

/// Configurations of the list, narrowed to one name when given
fn select(
    graph: &ProjectGraph,
    list: &ObjectId,
    configuration: Option<&str>,
) -> Result<Vec<ObjectId>> {
    let all = graph.configurations(list)?;
    let selected: Vec<ObjectId> = all
        .into_iter()
        .filter(|(_, c)| configuration.map_or(true, |name| c.name == name))
        .map(|(id, _)| id)
        .collect();
    match configuration {
        Some(name) if selected.is_empty() => {
            Err(GraphError::not_found(ObjectKind::Configuration, name))
        }
        _ => Ok(selected),
    }
}

/// Row of [`list_build_configurations`]
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationEntry {
    pub name: String,
    pub setting_count: usize,
    pub is_default: bool,
}

pub fn list_build_configurations(graph: &ProjectGraph, target: Option<&str>) -> Result<Vec<ConfigurationEntry>> {
    let list_id = configuration_list(graph, target)?;
    let default = &graph.objects.get::<ConfigurationList>(&list_id)?.default_configuration_name;
    Ok(graph
        .configurations(&list_id)?
        .into_iter()
        .map(|(_, c)| ConfigurationEntry {
            name: c.name.clone(),
            setting_count: c.build_settings.len(),
            is_default: &c.name == default,
        })
        .collect())
}

/// Settings of one configuration
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationSettings {
    pub configuration: String,
    pub settings: BuildSettings,
}

pub fn get_build_settings(
    graph: &ProjectGraph,
    target: Option<&str>,
    configuration: Option<&str>,
) -> Result<Vec<ConfigurationSettings>> {
    let list = configuration_list(graph, target)?;
    select(graph, &list, configuration)?
        .iter()
        .map(|id| {
            let c = graph.objects.get::<Configuration>(id)?;
            Ok(ConfigurationSettings {
                configuration: c.name.clone(),
                settings: c.build_settings.clone(),
            })
        })
        .collect()
}

/// Set a build setting in one configuration, or in all of them when none is
/// named. Configurations already holding the value are left alone.
pub fn set_build_setting(
    graph: &mut ProjectGraph,
    target: Option<&str>,
    key: &str,
    value: SettingValue,
    configuration: Option<&str>,
) -> Result<Outcome> {
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(GraphError::InvalidArgument(format!(
            "'{}' is not a valid build setting name",
            key
        )));
    }
    let list = configuration_list(graph, target)?;
    let scope = target.unwrap_or("project");

    let mut changed = Vec::new();
    for id in select(graph, &list, configuration)? {
        let c = graph.objects.get_mut::<Configuration>(&id)?;
        if c.build_settings.get(key) != Some(&value) {
            c.build_settings.insert(key.to_string(), value.clone());
            changed.push(c.name.clone());
        }
    }

    if changed.is_empty() {
        tracing::debug!("{} already set to {} for {}", key, value, scope);
        return Ok(Outcome::unchanged(format!(
            "{} is already {} for '{}'",
            key, value, scope
        )));
    }
    tracing::info!("Set {} = {} for {} ({})", key, value, scope, changed.join(", "));
    Ok(Outcome::applied(format!(
        "Set {} = {} for '{}' ({})",
        key,
        value,
        scope,
        changed.join(", ")
    )))
}
