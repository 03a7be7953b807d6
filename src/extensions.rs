use pathdiff::diff_paths;
use std::path::{Path, PathBuf};

pub trait PathExtension {
    /// Joins a relative path onto `base`; absolute paths are returned as-is.
    fn resolve_against(&self, base: &Path) -> PathBuf;

    /// Path relative to `base` when one exists, for log output.
    fn relative_to(&self, base: &Path) -> PathBuf;

    fn has_extension(&self, extension: &str) -> bool;
}

impl PathExtension for Path {
    fn resolve_against(&self, base: &Path) -> PathBuf {
        if self.is_absolute() {
            self.to_path_buf()
        } else {
            base.join(self)
        }
    }

    fn relative_to(&self, base: &Path) -> PathBuf {
        diff_paths(self, base)
            .filter(|relative| !relative.starts_with(".."))
            .unwrap_or_else(|| self.to_path_buf())
    }

    fn has_extension(&self, extension: &str) -> bool {
        self.extension()
            .map(|actual| actual.eq_ignore_ascii_case(extension))
            .unwrap_or(false)
    }
}

/// VB6 files use backslash separators regardless of the host platform.
pub fn normalize_separators(path: &str) -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(path)
    } else {
        PathBuf::from(path.replace('\\', "/"))
    }
}
