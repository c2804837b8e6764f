use std::path::Path;

/// lastKnownFileType for a file, derived from its extension
pub fn file_type_for_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "swift" => "sourcecode.swift",
        "m" => "sourcecode.c.objc",
        "mm" => "sourcecode.cpp.objcpp",
        "c" => "sourcecode.c.c",
        "cpp" | "cc" | "cxx" => "sourcecode.cpp.cpp",
        "h" => "sourcecode.c.h",
        "hpp" | "hxx" => "sourcecode.cpp.h",
        "metal" => "sourcecode.metal",
        "storyboard" => "file.storyboard",
        "xib" => "file.xib",
        "xcassets" => "folder.assetcatalog",
        "strings" => "text.plist.strings",
        "stringsdict" => "text.plist.stringsdict",
        "xcstrings" => "text.json.xcstrings",
        "plist" => "text.plist.xml",
        "entitlements" => "text.plist.entitlements",
        "json" => "text.json",
        "md" => "net.daringfireball.markdown",
        "txt" => "text",
        "png" => "image.png",
        "jpg" | "jpeg" => "image.jpeg",
        "pdf" => "image.pdf",
        "framework" => "wrapper.framework",
        "xcframework" => "wrapper.xcframework",
        "dylib" => "compiled.mach-o.dylib",
        "tbd" => "sourcecode.text-based-dylib-definition",
        "a" => "archive.ar",
        "bundle" => "wrapper.plug-in",
        "xcdatamodeld" => "wrapper.xcdatamodeld",
        "xcconfig" => "text.xcconfig",
        "sh" => "text.script.sh",
        _ => "file",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_types() {
        assert_eq!(file_type_for_path("Sources/App.swift"), "sourcecode.swift");
        assert_eq!(file_type_for_path("Bridge.H"), "sourcecode.c.h");
        assert_eq!(file_type_for_path("Assets.xcassets"), "folder.assetcatalog");
        assert_eq!(file_type_for_path("LICENSE"), "file");
    }
}
