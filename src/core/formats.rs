use std::path::Path;

/// Extensions offered by the file picker. Selection is not restricted to these;
/// the extractor sniffs the container from the file contents.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "bmp", "gif", "webp",
];

pub fn has_supported_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|value| value.to_str()) else {
        return false;
    };

    let ext = ext.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|known| *known == ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_supported_extension(Path::new("holiday.JPG")));
        assert!(has_supported_extension(Path::new("/tmp/scan.tiff")));
        assert!(!has_supported_extension(Path::new("notes.txt")));
        assert!(!has_supported_extension(Path::new("no_extension")));
    }
}
