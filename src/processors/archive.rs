//! Safe extraction and repacking of EPUB (zip) containers

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::core::errors::{Result, TranslationError};
use crate::processors::replace;

/// Name of the EPUB media type entry, which must come first and uncompressed
const MIMETYPE_ENTRY: &str = "mimetype";

/// Per-run directory holding the extracted book.
///
/// The directory and everything under it is removed when this value is dropped.
#[derive(Debug)]
pub struct WorkingDirectory {
    dir: tempfile::TempDir,
}

impl WorkingDirectory {
    /// Create a fresh, uniquely named directory under `root`
    pub fn create(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| TranslationError::file(root, e))?;
        let dir = tempfile::Builder::new()
            .prefix("epub-translate-")
            .tempdir_in(root)
            .map_err(|e| TranslationError::file(root, e))?;
        info!("Working directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Root of the extracted tree
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Extract `archive` into a new working directory under `work_root`
pub fn unpack(archive: &Path, work_root: &Path) -> Result<WorkingDirectory> {
    let work_dir = WorkingDirectory::create(work_root)?;
    extract_into(archive, work_dir.path())?;
    Ok(work_dir)
}

/// Extract every entry of `archive` below `dest`.
///
/// Fails with [`TranslationError::PathTraversal`] on the first entry that
/// would land outside `dest`.
pub fn extract_into(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| TranslationError::file(archive, e))?;
    let mut zip = ZipArchive::new(file)?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let relative = sanitize_entry_path(entry.name())?;
        let destination = dest.join(&relative);

        if !destination.starts_with(dest) || destination == dest {
            return Err(TranslationError::PathTraversal {
                entry: entry.name().to_string(),
            });
        }

        if entry.is_dir() {
            fs::create_dir_all(&destination).map_err(|e| TranslationError::file(&destination, e))?;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| TranslationError::file(parent, e))?;
        }

        let mut output =
            File::create(&destination).map_err(|e| TranslationError::file(&destination, e))?;
        io::copy(&mut entry, &mut output).map_err(|e| TranslationError::FileError {
            path: entry.name().to_string(),
            message: e.to_string(),
        })?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            // permission bits only, and always readable/writable by us
            let perms = fs::Permissions::from_mode((mode & 0o777) | 0o600);
            fs::set_permissions(&destination, perms)
                .map_err(|e| TranslationError::file(&destination, e))?;
        }
    }

    debug!("Extracted {} entries from {}", zip.len(), archive.display());
    Ok(())
}

/// Turn an entry name into a relative path made only of normal segments
fn sanitize_entry_path(entry: &str) -> Result<PathBuf> {
    let traversal = || TranslationError::PathTraversal {
        entry: entry.to_string(),
    };

    let path = Path::new(entry);
    if path.is_absolute() || entry.starts_with('/') || entry.starts_with('\\') {
        return Err(traversal());
    }

    let mut sanitized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => sanitized.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(traversal())
            }
        }
    }

    if sanitized.as_os_str().is_empty() {
        return Err(traversal());
    }
    Ok(sanitized)
}

/// Write every file under `root` into a new archive at `output`.
///
/// Returns the number of entries written.
pub fn repack(root: &Path, output: &Path) -> Result<usize> {
    let file = File::create(output).map_err(|e| TranslationError::file(output, e))?;
    let mut zip = ZipWriter::new(file);

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| TranslationError::file(root, e))?;
        if entry.file_type().is_file() && !replace::is_staged_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    // EPUB readers expect the media type to be the first, stored entry
    if let Some(pos) = files.iter().position(|p| p == &root.join(MIMETYPE_ENTRY)) {
        let mimetype = files.remove(pos);
        files.insert(0, mimetype);
    }

    for path in &files {
        let name = entry_name(root, path)?;
        let method = if name == MIMETYPE_ENTRY {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let options = file_options(path, method)?;

        zip.start_file(name.as_str(), options)?;
        let mut source = File::open(path).map_err(|e| TranslationError::file(path, e))?;
        io::copy(&mut source, &mut zip).map_err(|e| TranslationError::FileError {
            path: name.clone(),
            message: e.to_string(),
        })?;
    }

    let mut inner = zip.finish()?;
    inner.flush().map_err(|e| TranslationError::file(output, e))?;

    info!("Packed {} entries into {}", files.len(), output.display());
    Ok(files.len())
}

/// `/`-separated path of `path` relative to `root`
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| TranslationError::PathTraversal {
        entry: path.display().to_string(),
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
            _ => {
                return Err(TranslationError::PathTraversal {
                    entry: relative.display().to_string(),
                })
            }
        }
    }
    Ok(segments.join("/"))
}

fn file_options(path: &Path, method: CompressionMethod) -> Result<FileOptions> {
    let options = FileOptions::default().compression_method(method);

    #[cfg(unix)]
    let options = {
        let mode = fs::metadata(path)
            .map_err(|e| TranslationError::file(path, e))?
            .permissions()
            .mode();
        options.unix_permissions(mode & 0o777)
    };

    #[cfg(not(unix))]
    let _ = path;

    Ok(options)
}
