//! Product types and the product-type to file-extension/UTI table

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::GraphError;

/// Kind of product a target builds. Stored as its uniform type identifier
/// (`com.apple.product-type.application`); any spelling [`FromStr`] accepts
/// is read back.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum ProductType {
    #[default]
    Application,
    Framework,
    StaticFramework,
    XcFramework,
    DynamicLibrary,
    StaticLibrary,
    Bundle,
    UnitTestBundle,
    UiTestBundle,
    OcUnitTestBundle,
    AppExtension,
    ExtensionKitExtension,
    CommandLineTool,
    WatchApp,
    Watch2App,
    Watch2AppContainer,
    WatchExtension,
    Watch2Extension,
    TvExtension,
    MessagesApplication,
    MessagesExtension,
    StickerPack,
    XpcService,
    IntentsServiceExtension,
    OnDemandInstallCapableApplication,
    InstrumentsPackage,
    MetalLibrary,
    DriverExtension,
    SystemExtension,
}

/// Static description of one product type
#[derive(Debug, Clone, Copy)]
pub struct ProductInfo {
    pub product_type: ProductType,
    /// Name accepted by callers (snake_case)
    pub name: &'static str,
    /// Uniform type identifier written to the target
    pub identifier: &'static str,
    /// Extension of the built product, empty for bare executables
    pub extension: &'static str,
    /// explicitFileType of the product file reference
    pub file_type: &'static str,
}

const PRODUCT_TABLE: &[ProductInfo] = &[
    ProductInfo { product_type: ProductType::Application, name: "application", identifier: "com.apple.product-type.application", extension: "app", file_type: "wrapper.application" },
    ProductInfo { product_type: ProductType::Framework, name: "framework", identifier: "com.apple.product-type.framework", extension: "framework", file_type: "wrapper.framework" },
    ProductInfo { product_type: ProductType::StaticFramework, name: "static_framework", identifier: "com.apple.product-type.framework.static", extension: "framework", file_type: "wrapper.framework.static" },
    ProductInfo { product_type: ProductType::XcFramework, name: "xcframework", identifier: "com.apple.product-type.xcframework", extension: "xcframework", file_type: "wrapper.xcframework" },
    ProductInfo { product_type: ProductType::DynamicLibrary, name: "dynamic_library", identifier: "com.apple.product-type.library.dynamic", extension: "dylib", file_type: "compiled.mach-o.dylib" },
    ProductInfo { product_type: ProductType::StaticLibrary, name: "static_library", identifier: "com.apple.product-type.library.static", extension: "a", file_type: "archive.ar" },
    ProductInfo { product_type: ProductType::Bundle, name: "bundle", identifier: "com.apple.product-type.bundle", extension: "bundle", file_type: "wrapper.cfbundle" },
    ProductInfo { product_type: ProductType::UnitTestBundle, name: "unit_test_bundle", identifier: "com.apple.product-type.bundle.unit-test", extension: "xctest", file_type: "wrapper.cfbundle" },
    ProductInfo { product_type: ProductType::UiTestBundle, name: "ui_test_bundle", identifier: "com.apple.product-type.bundle.ui-testing", extension: "xctest", file_type: "wrapper.cfbundle" },
    ProductInfo { product_type: ProductType::OcUnitTestBundle, name: "ocunit_test_bundle", identifier: "com.apple.product-type.bundle.ocunit-test", extension: "octest", file_type: "wrapper.cfbundle" },
    ProductInfo { product_type: ProductType::AppExtension, name: "app_extension", identifier: "com.apple.product-type.app-extension", extension: "appex", file_type: "wrapper.app-extension" },
    ProductInfo { product_type: ProductType::ExtensionKitExtension, name: "extensionkit_extension", identifier: "com.apple.product-type.extensionkit-extension", extension: "appex", file_type: "wrapper.extensionkit-extension" },
    ProductInfo { product_type: ProductType::CommandLineTool, name: "command_line_tool", identifier: "com.apple.product-type.tool", extension: "", file_type: "compiled.mach-o.executable" },
    ProductInfo { product_type: ProductType::WatchApp, name: "watch_app", identifier: "com.apple.product-type.application.watchapp", extension: "app", file_type: "wrapper.application" },
    ProductInfo { product_type: ProductType::Watch2App, name: "watch2_app", identifier: "com.apple.product-type.application.watchapp2", extension: "app", file_type: "wrapper.application" },
    ProductInfo { product_type: ProductType::Watch2AppContainer, name: "watch2_app_container", identifier: "com.apple.product-type.application.watchapp2-container", extension: "app", file_type: "wrapper.application" },
    ProductInfo { product_type: ProductType::WatchExtension, name: "watch_extension", identifier: "com.apple.product-type.watchkit-extension", extension: "appex", file_type: "wrapper.app-extension" },
    ProductInfo { product_type: ProductType::Watch2Extension, name: "watch2_extension", identifier: "com.apple.product-type.watchkit2-extension", extension: "appex", file_type: "wrapper.app-extension" },
    ProductInfo { product_type: ProductType::TvExtension, name: "tv_extension", identifier: "com.apple.product-type.tv-app-extension", extension: "appex", file_type: "wrapper.app-extension" },
    ProductInfo { product_type: ProductType::MessagesApplication, name: "messages_application", identifier: "com.apple.product-type.application.messages", extension: "app", file_type: "wrapper.application" },
    ProductInfo { product_type: ProductType::MessagesExtension, name: "messages_extension", identifier: "com.apple.product-type.app-extension.messages", extension: "appex", file_type: "wrapper.app-extension" },
    ProductInfo { product_type: ProductType::StickerPack, name: "sticker_pack", identifier: "com.apple.product-type.app-extension.messages-sticker-pack", extension: "appex", file_type: "wrapper.app-extension" },
    ProductInfo { product_type: ProductType::XpcService, name: "xpc_service", identifier: "com.apple.product-type.xpc-service", extension: "xpc", file_type: "wrapper.xpc-service" },
    ProductInfo { product_type: ProductType::IntentsServiceExtension, name: "intents_service_extension", identifier: "com.apple.product-type.app-extension.intents-service", extension: "appex", file_type: "wrapper.app-extension" },
    ProductInfo { product_type: ProductType::OnDemandInstallCapableApplication, name: "on_demand_install_capable_application", identifier: "com.apple.product-type.application.on-demand-install-capable", extension: "app", file_type: "wrapper.application" },
    ProductInfo { product_type: ProductType::InstrumentsPackage, name: "instruments_package", identifier: "com.apple.product-type.instruments-package", extension: "instrpkg", file_type: "com.apple.instruments.instrpkg" },
    ProductInfo { product_type: ProductType::MetalLibrary, name: "metal_library", identifier: "com.apple.product-type.metal-library", extension: "metallib", file_type: "archive.metal-library" },
    ProductInfo { product_type: ProductType::DriverExtension, name: "driver_extension", identifier: "com.apple.product-type.driver-extension", extension: "dext", file_type: "wrapper.driver-extension" },
    ProductInfo { product_type: ProductType::SystemExtension, name: "system_extension", identifier: "com.apple.product-type.system-extension", extension: "systemextension", file_type: "wrapper.system-extension" },
];

impl ProductType {
    pub fn info(self) -> &'static ProductInfo {
        PRODUCT_TABLE
            .iter()
            .find(|info| info.product_type == self)
            .unwrap_or(&PRODUCT_TABLE[0])
    }

    pub fn identifier(self) -> &'static str {
        self.info().identifier
    }

    /// File name of the built product, e.g. `App.app` or `tool`
    pub fn product_file_name(self, product_name: &str) -> String {
        let ext = self.info().extension;
        if ext.is_empty() {
            product_name.to_string()
        } else {
            format!("{}.{}", product_name, ext)
        }
    }

    /// Whether the product is a bundle with its own Info.plist
    pub fn has_info_plist(self) -> bool {
        !matches!(
            self,
            ProductType::CommandLineTool
                | ProductType::StaticLibrary
                | ProductType::DynamicLibrary
                | ProductType::MetalLibrary
                | ProductType::XcFramework
        )
    }

    pub fn names() -> Vec<&'static str> {
        PRODUCT_TABLE.iter().map(|info| info.name).collect()
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.info().name)
    }
}

impl From<ProductType> for String {
    fn from(product_type: ProductType) -> Self {
        product_type.identifier().to_string()
    }
}

impl TryFrom<String> for ProductType {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn fold(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-' && *c != ' ')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

impl FromStr for ProductType {
    type Err = GraphError;

    /// Accepts the snake_case name, its camelCase spelling, the UTI, or the
    /// common short forms `app`, `tool`, `unit_test` and `ui_test`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(info) = PRODUCT_TABLE.iter().find(|info| info.identifier == trimmed) {
            return Ok(info.product_type);
        }
        let folded = fold(trimmed);
        let alias = match folded.as_str() {
            "app" => Some(ProductType::Application),
            "tool" | "commandline" | "cli" => Some(ProductType::CommandLineTool),
            "unittest" | "unittests" => Some(ProductType::UnitTestBundle),
            "uitest" | "uitests" | "uitesting" => Some(ProductType::UiTestBundle),
            "extension" | "appex" => Some(ProductType::AppExtension),
            _ => None,
        };
        if let Some(product_type) = alias {
            return Ok(product_type);
        }
        PRODUCT_TABLE
            .iter()
            .find(|info| fold(info.name) == folded)
            .map(|info| info.product_type)
            .ok_or_else(|| {
                GraphError::InvalidArgument(format!(
                    "Unknown product type '{}'. Valid types: {}",
                    trimmed,
                    ProductType::names().join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_variant_once() {
        for info in PRODUCT_TABLE {
            let matches = PRODUCT_TABLE
                .iter()
                .filter(|other| other.product_type == info.product_type)
                .count();
            assert_eq!(matches, 1, "{} listed twice", info.name);
            assert_eq!(info.product_type.info().name, info.name);
        }
        assert!(PRODUCT_TABLE.len() >= 25);
    }

    #[test]
    fn test_parse_product_type() {
        assert_eq!("app".parse::<ProductType>().unwrap(), ProductType::Application);
        assert_eq!(
            "unitTestBundle".parse::<ProductType>().unwrap(),
            ProductType::UnitTestBundle
        );
        assert_eq!(
            "app_extension".parse::<ProductType>().unwrap(),
            ProductType::AppExtension
        );
        assert_eq!(
            "com.apple.product-type.framework".parse::<ProductType>().unwrap(),
            ProductType::Framework
        );
        let err = "spaceship".parse::<ProductType>().unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }

    #[test]
    fn test_serialized_as_type_identifier() {
        let json = serde_json::to_string(&ProductType::UnitTestBundle).unwrap();
        assert_eq!(json, r#""com.apple.product-type.bundle.unit-test""#);
        let back: ProductType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProductType::UnitTestBundle);
        // Older documents with the enum spelling still load
        let legacy: ProductType = serde_json::from_str(r#""appExtension""#).unwrap();
        assert_eq!(legacy, ProductType::AppExtension);
        assert!(serde_json::from_str::<ProductType>(r#""spaceship""#).is_err());
    }

    #[test]
    fn test_product_file_name() {
        assert_eq!(ProductType::Application.product_file_name("App"), "App.app");
        assert_eq!(ProductType::AppExtension.product_file_name("Widget"), "Widget.appex");
        assert_eq!(ProductType::CommandLineTool.product_file_name("tool"), "tool");
        assert_eq!(ProductType::StaticLibrary.product_file_name("libCore"), "libCore.a");
    }
}
