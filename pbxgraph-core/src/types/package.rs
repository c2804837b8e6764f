//! Swift package version requirements

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::GraphError;

/// Version rule of a remote package reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VersionRequirement {
    UpToNextMajorVersion {
        #[serde(rename = "minimumVersion")]
        minimum_version: String,
    },
    UpToNextMinorVersion {
        #[serde(rename = "minimumVersion")]
        minimum_version: String,
    },
    ExactVersion {
        version: String,
    },
    VersionRange {
        #[serde(rename = "minimumVersion")]
        minimum_version: String,
        #[serde(rename = "maximumVersion")]
        maximum_version: String,
    },
    Branch {
        branch: String,
    },
    Revision {
        revision: String,
    },
}

fn version_regex() -> &'static Regex {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    VERSION.get_or_init(|| Regex::new(r"^\d+(\.\d+){0,2}([-+][0-9A-Za-z.-]+)?$").unwrap())
}

fn check_version(version: &str) -> Result<String, GraphError> {
    let version = version.trim();
    if version_regex().is_match(version) {
        Ok(version.to_string())
    } else {
        Err(GraphError::InvalidArgument(format!(
            "'{}' is not a valid semantic version",
            version
        )))
    }
}

impl FromStr for VersionRequirement {
    type Err = GraphError;

    /// Parses `1.2.0`, `from: 1.2.0`, `upToNextMinor: 1.2.0`, `exact: 1.2.3`,
    /// `range: 1.0.0..<2.0.0`, `branch: main` and `revision: <sha>`.
    /// A bare version means "up to next major".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((kind, value)) = s.split_once(':') else {
            return Ok(VersionRequirement::UpToNextMajorVersion {
                minimum_version: check_version(s)?,
            });
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(GraphError::InvalidArgument(format!(
                "Missing value in version requirement '{}'",
                s
            )));
        }

        match kind.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "from" | "uptonextmajor" | "uptonextmajorversion" | "major" => {
                Ok(VersionRequirement::UpToNextMajorVersion {
                    minimum_version: check_version(value)?,
                })
            }
            "uptonextminor" | "uptonextminorversion" | "minor" => {
                Ok(VersionRequirement::UpToNextMinorVersion {
                    minimum_version: check_version(value)?,
                })
            }
            "exact" | "exactversion" => Ok(VersionRequirement::ExactVersion {
                version: check_version(value)?,
            }),
            "range" | "versionrange" => {
                let (min, max) = value.split_once("..<").ok_or_else(|| {
                    GraphError::InvalidArgument(format!(
                        "Range requirement must look like 'range: 1.0.0..<2.0.0', got '{}'",
                        value
                    ))
                })?;
                Ok(VersionRequirement::VersionRange {
                    minimum_version: check_version(min)?,
                    maximum_version: check_version(max)?,
                })
            }
            "branch" => Ok(VersionRequirement::Branch {
                branch: value.to_string(),
            }),
            "revision" | "commit" => Ok(VersionRequirement::Revision {
                revision: value.to_string(),
            }),
            other => Err(GraphError::InvalidArgument(format!(
                "Unknown version requirement kind '{}'. Use from, upToNextMinor, exact, range, branch or revision",
                other
            ))),
        }
    }
}

impl std::fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionRequirement::UpToNextMajorVersion { minimum_version } => {
                write!(f, "from {}", minimum_version)
            }
            VersionRequirement::UpToNextMinorVersion { minimum_version } => {
                write!(f, "up to next minor from {}", minimum_version)
            }
            VersionRequirement::ExactVersion { version } => write!(f, "exactly {}", version),
            VersionRequirement::VersionRange {
                minimum_version,
                maximum_version,
            } => write!(f, "{}..<{}", minimum_version, maximum_version),
            VersionRequirement::Branch { branch } => write!(f, "branch {}", branch),
            VersionRequirement::Revision { revision } => write!(f, "revision {}", revision),
        }
    }
}
