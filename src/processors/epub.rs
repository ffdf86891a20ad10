//! ePub translation pipeline: unpack, translate markup files one by one, repack

use indicatif::ProgressBar;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::client::DocumentTranslator;
use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{CandidateFile, FileOutcome, JobStatus, RunReport, TranslationJob};
use crate::processors::{archive, selector};

/// ePub processor running the whole translation pipeline
#[derive(Clone)]
pub struct EpubProcessor {
    translator: DocumentTranslator,
    progress: ProgressBar,
}

impl fmt::Debug for EpubProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpubProcessor")
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}

impl EpubProcessor {
    /// Create a new ePub processor
    pub fn new(translator: DocumentTranslator) -> Self {
        Self {
            translator,
            progress: ProgressBar::hidden(),
        }
    }

    /// Create from a configuration
    pub fn from_config(config: Arc<TranslatorConfig>) -> Result<Self> {
        let translator = DocumentTranslator::new(config)?;
        Ok(Self::new(translator))
    }

    /// Report per-file progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Translate `input` into a new archive at `output`.
    ///
    /// Files whose translation fails keep their original content; the run
    /// only fails when the archive itself cannot be read or written.
    pub async fn translate_epub(&self, input: &Path, output: &Path) -> Result<RunReport> {
        let started_at = chrono::Utc::now();
        info!("ePub translation: {} -> {}", input.display(), output.display());

        let work_root = self.translator.config().work_root();
        let archive_path = input.to_path_buf();
        let work_dir =
            tokio::task::spawn_blocking(move || archive::unpack(&archive_path, &work_root))
                .await??;

        let candidates = selector::candidates(work_dir.path()).collect::<Result<Vec<_>>>()?;
        info!("Found {} markup files to translate", candidates.len());
        self.progress.set_length(candidates.len() as u64);

        let mut files = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let relative = relative_name(work_dir.path(), &candidate.path);
            self.progress.set_message(relative.clone());

            let outcome = match self.translate_file(candidate).await {
                Ok(status) => FileOutcome {
                    path: relative,
                    status,
                    error: None,
                },
                Err((_, e)) if e.is_archive_fatal() => return Err(e),
                Err((status, e)) => {
                    warn!("Keeping original {}: {}", relative, e);
                    FileOutcome {
                        path: relative,
                        status,
                        error: Some(e.to_string()),
                    }
                }
            };
            files.push(outcome);
            self.progress.inc(1);
        }

        let root = work_dir.path().to_path_buf();
        let output_path = output.to_path_buf();
        let entries =
            tokio::task::spawn_blocking(move || archive::repack(&root, &output_path)).await??;
        debug!("Repacked {} entries", entries);
        drop(work_dir);

        let report = RunReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            started_at,
            finished_at: chrono::Utc::now(),
            files,
        };
        info!(
            "Completed: {} translated, {} kept original",
            report.translated(),
            report.failed()
        );
        Ok(report)
    }

    /// Normalize, then run one job; the error side carries the job's final status
    async fn translate_file(
        &self,
        candidate: &CandidateFile,
    ) -> std::result::Result<JobStatus, (JobStatus, TranslationError)> {
        debug!("Translating: {}", candidate.path.display());

        let normalized = selector::normalize(candidate).map_err(|e| (JobStatus::Failed, e))?;
        let mut job = TranslationJob::new(candidate.path.clone(), normalized);

        match self.translator.run(&mut job).await {
            Ok(()) => Ok(job.status),
            Err(e) => Err((job.status, e)),
        }
    }
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/")
}
