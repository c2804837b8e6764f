//! Build phase variants

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::GraphError;

/// The closed set of build phase kinds, with per-kind payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PhaseKind {
    Sources,
    Resources,
    Frameworks,
    Headers,
    CopyFiles {
        destination: CopyDestination,
        #[serde(default)]
        subpath: String,
    },
    ShellScript {
        script: String,
        #[serde(rename = "shellPath", default = "default_shell")]
        shell_path: String,
        #[serde(rename = "inputPaths", default)]
        input_paths: Vec<String>,
        #[serde(rename = "outputPaths", default)]
        output_paths: Vec<String>,
    },
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

/// Payload-free discriminant of [`PhaseKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseVariant {
    Sources,
    Resources,
    Frameworks,
    Headers,
    CopyFiles,
    ShellScript,
}

impl PhaseKind {
    pub fn variant(&self) -> PhaseVariant {
        match self {
            PhaseKind::Sources => PhaseVariant::Sources,
            PhaseKind::Resources => PhaseVariant::Resources,
            PhaseKind::Frameworks => PhaseVariant::Frameworks,
            PhaseKind::Headers => PhaseVariant::Headers,
            PhaseKind::CopyFiles { .. } => PhaseVariant::CopyFiles,
            PhaseKind::ShellScript { .. } => PhaseVariant::ShellScript,
        }
    }

    pub fn shell_script(script: impl Into<String>) -> Self {
        PhaseKind::ShellScript {
            script: script.into(),
            shell_path: default_shell(),
            input_paths: Vec::new(),
            output_paths: Vec::new(),
        }
    }
}

impl PhaseVariant {
    pub fn default_name(self) -> &'static str {
        match self {
            PhaseVariant::Sources => "Sources",
            PhaseVariant::Resources => "Resources",
            PhaseVariant::Frameworks => "Frameworks",
            PhaseVariant::Headers => "Headers",
            PhaseVariant::CopyFiles => "Copy Files",
            PhaseVariant::ShellScript => "Run Script",
        }
    }

    /// Kind for variants that carry no payload
    pub fn empty_kind(self) -> Option<PhaseKind> {
        match self {
            PhaseVariant::Sources => Some(PhaseKind::Sources),
            PhaseVariant::Resources => Some(PhaseKind::Resources),
            PhaseVariant::Frameworks => Some(PhaseKind::Frameworks),
            PhaseVariant::Headers => Some(PhaseKind::Headers),
            PhaseVariant::CopyFiles | PhaseVariant::ShellScript => None,
        }
    }
}

impl std::fmt::Display for PhaseVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.default_name())
    }
}

impl FromStr for PhaseVariant {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .flat_map(|c| c.to_lowercase())
            .collect();
        match folded.as_str() {
            "sources" | "source" => Ok(PhaseVariant::Sources),
            "resources" | "resource" => Ok(PhaseVariant::Resources),
            "frameworks" | "framework" => Ok(PhaseVariant::Frameworks),
            "headers" | "header" => Ok(PhaseVariant::Headers),
            "copyfiles" => Ok(PhaseVariant::CopyFiles),
            "runscript" | "shellscript" | "script" => Ok(PhaseVariant::ShellScript),
            _ => Err(GraphError::InvalidArgument(format!(
                "Unknown build phase type '{}'. Valid types: sources, resources, frameworks, headers, run_script, copy_files",
                s.trim()
            ))),
        }
    }
}

/// Destination folder of a copy-files phase (dstSubfolderSpec)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CopyDestination {
    AbsolutePath,
    Wrapper,
    Executables,
    Resources,
    Frameworks,
    SharedFrameworks,
    SharedSupport,
    Plugins,
    JavaResources,
    ProductsDirectory,
}

const DESTINATIONS: &[(CopyDestination, &str, u8)] = &[
    (CopyDestination::AbsolutePath, "absolute_path", 0),
    (CopyDestination::Wrapper, "wrapper", 1),
    (CopyDestination::Executables, "executables", 6),
    (CopyDestination::Resources, "resources", 7),
    (CopyDestination::Frameworks, "frameworks", 10),
    (CopyDestination::SharedFrameworks, "shared_frameworks", 11),
    (CopyDestination::SharedSupport, "shared_support", 12),
    (CopyDestination::Plugins, "plugins", 13),
    (CopyDestination::JavaResources, "java_resources", 15),
    (CopyDestination::ProductsDirectory, "products_directory", 16),
];

impl CopyDestination {
    /// Numeric dstSubfolderSpec written to the project file
    pub fn subfolder_spec(self) -> u8 {
        DESTINATIONS
            .iter()
            .find(|(dest, _, _)| *dest == self)
            .map(|(_, _, spec)| *spec)
            .unwrap_or(0)
    }

    pub fn name(self) -> &'static str {
        DESTINATIONS
            .iter()
            .find(|(dest, _, _)| *dest == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("absolute_path")
    }

    /// Whether embedded products should be signed when copied here
    pub fn signs_on_copy(self) -> bool {
        matches!(
            self,
            CopyDestination::Frameworks
                | CopyDestination::SharedFrameworks
                | CopyDestination::Plugins
                | CopyDestination::Executables
        )
    }
}

impl std::fmt::Display for CopyDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CopyDestination {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .flat_map(|c| c.to_lowercase())
            .collect();
        let folded = match folded.as_str() {
            "absolute" => "absolutepath".to_string(),
            "productsdir" | "products" => "productsdirectory".to_string(),
            "executable" => "executables".to_string(),
            _ => folded,
        };
        DESTINATIONS
            .iter()
            .find(|(_, name, _)| name.replace('_', "") == folded)
            .map(|(dest, _, _)| *dest)
            .ok_or_else(|| {
                let names: Vec<&str> = DESTINATIONS.iter().map(|(_, name, _)| *name).collect();
                GraphError::InvalidArgument(format!(
                    "Unknown copy-files destination '{}'. Valid destinations: {}",
                    s.trim(),
                    names.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_destination() {
        assert_eq!(
            "frameworks".parse::<CopyDestination>().unwrap(),
            CopyDestination::Frameworks
        );
        assert_eq!(
            "sharedSupport".parse::<CopyDestination>().unwrap(),
            CopyDestination::SharedSupport
        );
        assert_eq!(
            "products_directory".parse::<CopyDestination>().unwrap(),
            CopyDestination::ProductsDirectory
        );
        assert!(matches!(
            "attic".parse::<CopyDestination>(),
            Err(GraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_phase_variant() {
        assert_eq!("run_script".parse::<PhaseVariant>().unwrap(), PhaseVariant::ShellScript);
        assert_eq!("Copy Files".parse::<PhaseVariant>().unwrap(), PhaseVariant::CopyFiles);
        assert_eq!("sources".parse::<PhaseVariant>().unwrap(), PhaseVariant::Sources);
        assert!("linker".parse::<PhaseVariant>().is_err());
    }

    #[test]
    fn test_subfolder_spec() {
        assert_eq!(CopyDestination::Frameworks.subfolder_spec(), 10);
        assert_eq!(CopyDestination::Plugins.subfolder_spec(), 13);
        assert_eq!(CopyDestination::AbsolutePath.subfolder_spec(), 0);
    }

    #[test]
    fn test_phase_kind_serialization() {
        let kind = PhaseKind::CopyFiles {
            destination: CopyDestination::Frameworks,
            subpath: String::new(),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "copyFiles");
        assert_eq!(json["destination"], "frameworks");

        let script: PhaseKind =
            serde_json::from_str(r#"{"type":"shellScript","script":"echo hi"}"#).unwrap();
        assert_eq!(script, PhaseKind::shell_script("echo hi"));
        assert_eq!(script.variant(), PhaseVariant::ShellScript);
    }
}
