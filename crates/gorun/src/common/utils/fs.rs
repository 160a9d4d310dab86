use std::path::{Path, PathBuf};

pub fn absolute_path(path: PathBuf) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(get_current_dir()?.join(path))
    }
}

pub fn get_current_dir() -> std::io::Result<PathBuf> {
    std::env::current_dir()
}

/// Returns true if `path` is a regular file with at least one byte in it.
pub fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.len() > 0)
        .unwrap_or(false)
}

/// Reads a text file, dropping a leading UTF-8 byte order mark.
pub fn read_text(path: &Path) -> std::io::Result<String> {
    let content = std::fs::read_to_string(path)?;
    Ok(match content.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => content,
    })
}

/// Normalizes two paths for comparison without touching the filesystem if they
/// cannot be canonicalized (e.g. a directory reported by the queue that no longer exists).
pub fn same_directory(a: &Path, b: &Path) -> bool {
    let normalize = |path: &Path| path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    a == b || normalize(a) == normalize(b)
}
