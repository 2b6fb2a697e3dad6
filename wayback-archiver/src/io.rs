use std::fs;
use std::path::Path;

use crate::error::{ArchiveError, Result};

pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path_ref = path.as_ref();
    fs::create_dir_all(path_ref).map_err(|e| ArchiveError::filesystem(path_ref, e))
}

/// Writes the page text, replacing whatever was there before.
pub fn write_page<P: AsRef<Path>>(path: P, contents: &str) -> Result<()> {
    let path_ref = path.as_ref();
    fs::write(path_ref, contents).map_err(|e| ArchiveError::filesystem(path_ref, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn ensure_dir_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("a").join("b");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn write_page_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("page.html");
        write_page(&file, "<html>old</html>").unwrap();
        write_page(&file, "<html>new</html>").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "<html>new</html>");
    }

    #[test]
    fn ensure_dir_over_a_file_fails() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("taken");
        fs::write(&file, "x").unwrap();
        let err = ensure_dir(&file).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert!(err.to_string().contains("taken"));
    }
}
