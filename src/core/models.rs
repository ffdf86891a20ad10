//! Core data models for document translation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Markup class of a file found in the working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkupKind {
    /// `.xhtml`: translatable, but must be normalized to `.html` first
    Translatable,
    /// `.html`: already in the form the service understands
    AlreadyNormalized,
    /// Anything else, never submitted
    Other,
}

impl MarkupKind {
    /// Classify a path by its extension, case as found
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("xhtml") => MarkupKind::Translatable,
            Some("html") => MarkupKind::AlreadyNormalized,
            _ => MarkupKind::Other,
        }
    }

    /// Whether files of this kind are sent to the service
    pub fn is_candidate(self) -> bool {
        !matches!(self, MarkupKind::Other)
    }
}

/// A file selected for translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub kind: MarkupKind,
}

impl CandidateFile {
    /// Build a candidate from a path, classifying it on the way
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = MarkupKind::of(&path);
        Self { path, kind }
    }
}

/// Lifecycle of a remote translation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Not yet sent to the service
    Idle,
    /// Upload accepted, document id and key received
    Submitted,
    /// Service is still working on the document
    Pending,
    /// Service reported `done`
    Done,
    /// Job failed at any stage
    Failed,
    /// Poll budget exhausted before `done`
    TimedOut,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "idle"),
            JobStatus::Submitted => write!(f, "submitted"),
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Identifier and access key issued by the service on upload.
///
/// Both fields are required; decoding fails if either is missing.
#[derive(Clone, Deserialize)]
pub struct DocumentHandle {
    pub document_id: String,
    pub document_key: String,
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("document_id", &self.document_id)
            .field("document_key", &"<redacted>")
            .finish()
    }
}

/// Body of a status check response
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentStatus {
    pub status: String,
    #[serde(default)]
    pub seconds_remaining: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DocumentStatus {
    /// Whether the translated document can be downloaded
    pub fn is_done(&self) -> bool {
        self.status == "done"
    }
}

/// State of one file moving through the service
#[derive(Debug, Clone)]
pub struct TranslationJob {
    /// File whose content gets replaced
    pub local_path: PathBuf,
    /// File that is uploaded; equals `local_path` for `.html` sources
    pub normalized_path: PathBuf,
    pub document: Option<DocumentHandle>,
    pub status: JobStatus,
    pub poll_attempts: u32,
}

impl TranslationJob {
    /// Create an idle job
    pub fn new(local_path: impl Into<PathBuf>, normalized_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            normalized_path: normalized_path.into(),
            document: None,
            status: JobStatus::Idle,
            poll_attempts: 0,
        }
    }

    /// Whether a separate normalization copy was made for this job
    pub fn has_normalized_copy(&self) -> bool {
        self.normalized_path != self.local_path
    }
}

/// Result of one candidate file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Path relative to the archive root
    pub path: String,
    pub status: JobStatus,
    pub error: Option<String>,
}

impl FileOutcome {
    /// Whether the file now holds translated content
    pub fn is_translated(&self) -> bool {
        self.status == JobStatus::Done && self.error.is_none()
    }
}

/// Summary of a whole pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub files: Vec<FileOutcome>,
}

impl RunReport {
    /// Number of files whose content was replaced
    pub fn translated(&self) -> usize {
        self.files.iter().filter(|f| f.is_translated()).count()
    }

    /// Number of files left untouched because their job failed
    pub fn failed(&self) -> usize {
        self.files.len() - self.translated()
    }
}
