use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{MetricsError, Result};

/// Read `path` as UTF-8. A missing file is `Ok(None)`, not an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_text(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MetricsError::io("read", path, e)),
    }
}

/// Create the directory that will hold `path` and return it.
///
/// A bare file name resolves to the current directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent(path: &Path) -> Result<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| MetricsError::io("create directory", &parent, e))?;
    Ok(parent)
}

/// Write `content` to `path`, creating parent directories first.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, content).map_err(|e| MetricsError::io("write", path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn read_text_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_text(&dir.path().join("absent.json")).unwrap(), None);
    }

    #[test]
    fn write_text_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("out.txt");
        write_text(&path, "hello").unwrap();
        assert_eq!(read_text(&path).unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn read_text_on_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_text(dir.path()).unwrap_err();
        assert!(matches!(err, MetricsError::Io { action: "read", .. }), "{err}");
    }

    #[test]
    fn ensure_parent_of_bare_name_is_cwd() {
        assert_eq!(ensure_parent(Path::new("file.json")).unwrap(), PathBuf::from("."));
    }
}
