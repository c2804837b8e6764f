use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::GraphError;

/// Target platform, selects SDK, deployment-target key and device family
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    #[default]
    #[serde(rename = "iOS")]
    Ios,
    #[serde(rename = "macOS")]
    Macos,
    #[serde(rename = "tvOS")]
    Tvos,
    #[serde(rename = "watchOS")]
    Watchos,
    #[serde(rename = "visionOS")]
    Visionos,
}

impl Platform {
    pub fn sdk_root(self) -> &'static str {
        match self {
            Platform::Ios => "iphoneos",
            Platform::Macos => "macosx",
            Platform::Tvos => "appletvos",
            Platform::Watchos => "watchos",
            Platform::Visionos => "xros",
        }
    }

    pub fn deployment_target_key(self) -> &'static str {
        match self {
            Platform::Ios => "IPHONEOS_DEPLOYMENT_TARGET",
            Platform::Macos => "MACOSX_DEPLOYMENT_TARGET",
            Platform::Tvos => "TVOS_DEPLOYMENT_TARGET",
            Platform::Watchos => "WATCHOS_DEPLOYMENT_TARGET",
            Platform::Visionos => "XROS_DEPLOYMENT_TARGET",
        }
    }

    /// Value of TARGETED_DEVICE_FAMILY; macOS targets carry none
    pub fn device_family(self) -> Option<&'static str> {
        match self {
            Platform::Ios => Some("1,2"),
            Platform::Macos => None,
            Platform::Tvos => Some("3"),
            Platform::Watchos => Some("4"),
            Platform::Visionos => Some("7"),
        }
    }

    pub fn default_deployment_target(self) -> &'static str {
        match self {
            Platform::Ios => "17.0",
            Platform::Macos => "14.0",
            Platform::Tvos => "17.0",
            Platform::Watchos => "10.0",
            Platform::Visionos => "1.0",
        }
    }

    pub fn all() -> [Platform; 5] {
        [
            Platform::Ios,
            Platform::Macos,
            Platform::Tvos,
            Platform::Watchos,
            Platform::Visionos,
        ]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Ios => write!(f, "iOS"),
            Platform::Macos => write!(f, "macOS"),
            Platform::Tvos => write!(f, "tvOS"),
            Platform::Watchos => write!(f, "watchOS"),
            Platform::Visionos => write!(f, "visionOS"),
        }
    }
}

impl FromStr for Platform {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ios" | "iphoneos" => Ok(Platform::Ios),
            "macos" | "macosx" | "osx" => Ok(Platform::Macos),
            "tvos" | "appletvos" => Ok(Platform::Tvos),
            "watchos" => Ok(Platform::Watchos),
            "visionos" | "xros" => Ok(Platform::Visionos),
            other => Err(GraphError::InvalidArgument(format!(
                "Unknown platform '{}'. Expected one of: iOS, macOS, tvOS, watchOS, visionOS",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platform() {
        assert_eq!("iOS".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("macosx".parse::<Platform>().unwrap(), Platform::Macos);
        assert!("android".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_keys() {
        assert_eq!(Platform::Macos.device_family(), None);
        assert_eq!(Platform::Ios.deployment_target_key(), "IPHONEOS_DEPLOYMENT_TARGET");
        assert_eq!(Platform::Visionos.sdk_root(), "xros");
    }
}
