//! Small helpers shared across modules

use std::path::{Path, PathBuf};

/// Normalizes a headword or query for indexing: lowercase only.
///
/// Diacritics, punctuation and internal whitespace are preserved, so
/// `"Run Down"` and `"run down"` meet but `"run  down"` does not.
pub fn normalize_headword(text: &str) -> String {
    text.to_lowercase()
}

/// Default cache location for a container: `<file name>.index.json` beside it.
pub fn default_cache_path(container: &Path) -> PathBuf {
    let mut name = container
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "container".into());
    name.push(".index.json");
    container.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_lowercase_only() {
        assert_eq!(normalize_headword("RUN"), "run");
        assert_eq!(normalize_headword("Run Down"), "run down");
        assert_eq!(normalize_headword("Ångström"), "ångström");
        assert_eq!(normalize_headword(" x-ray "), " x-ray ");
    }

    #[test]
    fn cache_path_sits_beside_container() {
        let path = default_cache_path(Path::new("dict/Contents/Body.data"));
        assert_eq!(path, Path::new("dict/Contents/Body.data.index.json"));
    }
}
