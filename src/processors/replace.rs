//! Atomic replacement of a source file with its translation

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::errors::{Result, TranslationError};

/// File name prefix of staged translations; such files are never packed
pub const STAGING_PREFIX: &str = ".translated-";

/// Whether `path` is a staged translation left behind by a failed rename
pub fn is_staged_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with(STAGING_PREFIX))
        .unwrap_or(false)
}

/// Put `translated` in place of `original` and drop the normalization copy.
///
/// The bytes are staged next to `original`, synced, then renamed over it, so
/// readers see either the old or the new content. The original is never
/// removed before the replacement is on disk. When the rename fails the
/// staged file is kept and its path is reported in the error. Once the
/// rename succeeded, failing to remove the normalization copy is only logged.
pub async fn commit_translation(original: &Path, normalized: &Path, translated: &[u8]) -> Result<()> {
    let original_owned = original.to_path_buf();
    let bytes = translated.to_vec();
    tokio::task::spawn_blocking(move || replace_file(&original_owned, &bytes)).await??;

    if normalized != original {
        match tokio::fs::remove_file(normalized).await {
            Ok(()) => debug!("Removed normalized copy {}", normalized.display()),
            Err(e) => warn!(
                "Translated {} but could not remove {}: {}",
                original.display(),
                normalized.display(),
                e
            ),
        }
    }

    Ok(())
}

/// Synchronous core of [`commit_translation`]
pub fn replace_file(original: &Path, content: &[u8]) -> Result<()> {
    let dir = original
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(&dir)
        .map_err(|e| TranslationError::file(&dir, e))?;

    staged
        .write_all(content)
        .map_err(|e| TranslationError::file(staged.path(), e))?;

    if let Ok(metadata) = std::fs::metadata(original) {
        std::fs::set_permissions(staged.path(), metadata.permissions())
            .map_err(|e| TranslationError::file(staged.path(), e))?;
    }

    staged
        .as_file()
        .sync_all()
        .map_err(|e| TranslationError::file(staged.path(), e))?;

    staged.persist(original).map_err(|e| {
        let kept = e.file.into_temp_path().keep();
        let location = match kept {
            Ok(path) => path.display().to_string(),
            Err(_) => "<lost>".to_string(),
        };
        TranslationError::FileError {
            path: original.display().to_string(),
            message: format!("{} (translation kept at {})", e.error, location),
        }
    })?;

    debug!("Replaced {} ({} bytes)", original.display(), content.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_commit_replaces_original() {
        let tmp = tempfile::tempdir().unwrap();
        let original = tmp.path().join("b.html");
        fs::write(&original, "<p>hello</p>").unwrap();

        commit_translation(&original, &original, b"<p>hallo</p>")
            .await
            .unwrap();

        assert_eq!(fs::read(&original).unwrap(), b"<p>hallo</p>");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_commit_removes_normalized_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let original = tmp.path().join("a.xhtml");
        let normalized = tmp.path().join("a.html");
        fs::write(&original, "<p>hello</p>").unwrap();
        fs::write(&normalized, "<p>hello</p>").unwrap();

        commit_translation(&original, &normalized, b"<p>bonjour</p>")
            .await
            .unwrap();

        assert_eq!(fs::read(&original).unwrap(), b"<p>bonjour</p>");
        assert!(!normalized.exists());
    }

    #[tokio::test]
    async fn test_commit_succeeds_when_copy_is_already_gone() {
        let tmp = tempfile::tempdir().unwrap();
        let original = tmp.path().join("a.xhtml");
        let normalized = tmp.path().join("a.html");
        fs::write(&original, "<p>hello</p>").unwrap();

        commit_translation(&original, &normalized, b"<p>hola</p>")
            .await
            .unwrap();

        assert_eq!(fs::read(&original).unwrap(), b"<p>hola</p>");
    }

    #[test]
    fn test_staged_files_are_recognized() {
        assert!(is_staged_file(Path::new("OEBPS/.translated-x1y2")));
        assert!(!is_staged_file(Path::new("OEBPS/translated.html")));
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let original = tmp.path().join("c.html");
        fs::write(&original, "old").unwrap();
        fs::set_permissions(&original, fs::Permissions::from_mode(0o640)).unwrap();

        replace_file(&original, b"new").unwrap();

        let mode = fs::metadata(&original).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_replace_into_missing_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let original = tmp.path().join("missing/dir/d.html");

        let err = replace_file(&original, b"new").unwrap_err();
        assert!(matches!(err, TranslationError::FileError { .. }));
    }
}
