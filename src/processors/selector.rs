//! Selection of markup files to translate

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{CandidateFile, MarkupKind};

/// Walk `root` and yield every translatable markup file.
///
/// Each call starts a fresh traversal; entries are visited in file name
/// order so the sequence is stable for a given directory state.
pub fn candidates(root: &Path) -> impl Iterator<Item = Result<CandidateFile>> {
    let root_display = root.to_path_buf();
    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let candidate = CandidateFile::new(entry.into_path());
                if candidate.kind.is_candidate() {
                    Some(Ok(candidate))
                } else {
                    None
                }
            }
            Ok(_) => None,
            Err(e) => Some(Err(TranslationError::file(&root_display, e))),
        })
}

/// Produce the path that gets uploaded for `candidate`.
///
/// `.xhtml` files get a byte-identical `.html` sibling; `.html` files are
/// used as they are.
pub fn normalize(candidate: &CandidateFile) -> Result<PathBuf> {
    match candidate.kind {
        MarkupKind::AlreadyNormalized => Ok(candidate.path.clone()),
        MarkupKind::Translatable => {
            let normalized = candidate.path.with_extension("html");
            if normalized.exists() {
                return Err(TranslationError::FileError {
                    path: normalized.display().to_string(),
                    message: "normalized copy would overwrite an existing file".to_string(),
                });
            }
            std::fs::copy(&candidate.path, &normalized)
                .map_err(|e| TranslationError::file(&normalized, e))?;
            debug!(
                "Normalized {} -> {}",
                candidate.path.display(),
                normalized.display()
            );
            Ok(normalized)
        }
        MarkupKind::Other => Err(TranslationError::FileError {
            path: candidate.path.display().to_string(),
            message: "not a translatable markup file".to_string(),
        }),
    }
}
