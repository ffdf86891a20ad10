//! Client for the remote document translation service

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{DocumentHandle, DocumentStatus, JobStatus, TranslationJob};
use crate::processors::replace;

/// Drives one document at a time through upload, status polling,
/// download and in-place replacement.
#[derive(Debug, Clone)]
pub struct DocumentTranslator {
    client: reqwest::Client,
    config: Arc<TranslatorConfig>,
}

impl DocumentTranslator {
    /// Create a new document translator
    pub fn new(config: Arc<TranslatorConfig>) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .build()?;

        Ok(Self { client, config })
    }

    /// Configuration shared with the rest of the run
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Run `job` to a terminal status.
    ///
    /// On success the translated bytes are in place at `job.local_path`.
    /// On failure the job is `Failed` or `TimedOut`, the original file is
    /// untouched and any normalization copy has been removed.
    pub async fn run(&self, job: &mut TranslationJob) -> Result<()> {
        let result = self.drive(job).await;

        if let Err(e) = &result {
            job.status = if e.is_timeout() {
                JobStatus::TimedOut
            } else {
                JobStatus::Failed
            };
            job.document = None;

            if job.has_normalized_copy() {
                if let Err(cleanup) = tokio::fs::remove_file(&job.normalized_path).await {
                    warn!(
                        "Failed to remove normalized copy {}: {}",
                        job.normalized_path.display(),
                        cleanup
                    );
                }
            }
        }

        result
    }

    async fn drive(&self, job: &mut TranslationJob) -> Result<()> {
        let handle = self.submit(&job.normalized_path).await?;
        job.document = Some(handle);
        job.status = JobStatus::Submitted;

        self.wait_until_done(job).await?;

        let handle = job.document.take().ok_or_else(|| {
            TranslationError::InternalError("job finished polling without a document".to_string())
        })?;
        let translated = self.fetch_result(&handle).await?;

        replace::commit_translation(&job.local_path, &job.normalized_path, &translated).await?;

        info!(
            "Translated {} ({} bytes)",
            job.local_path.display(),
            translated.len()
        );
        Ok(())
    }

    /// Upload a document; the service answers with its id and access key
    pub async fn submit(&self, path: &Path) -> Result<DocumentHandle> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| TranslationError::file(path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.html".to_string());

        debug!("Submitting {} ({} bytes)", path.display(), content.len());

        let part = reqwest::multipart::Part::bytes(content)
            .file_name(file_name)
            .mime_str("text/html")?;
        let form = reqwest::multipart::Form::new()
            .text("source_lang", self.config.source_lang.clone())
            .text("target_lang", self.config.target_lang.clone())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/document", self.config.endpoint()))
            .header("Authorization", self.config.authorization())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranslationError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| TranslationError::NetworkError {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let handle: DocumentHandle =
            serde_json::from_slice(&body).map_err(|e| TranslationError::InvalidResponseError {
                message: format!("upload response: {e}"),
            })?;

        debug!(
            "Document submitted: id={}, key={}",
            handle.document_id, handle.document_key
        );
        Ok(handle)
    }

    /// Ask the service once for the status of a document
    pub async fn poll_status(&self, handle: &DocumentHandle) -> Result<DocumentStatus> {
        let response = self
            .client
            .post(format!(
                "{}/document/{}",
                self.config.endpoint(),
                handle.document_id
            ))
            .header("Authorization", self.config.authorization())
            .form(&[("document_key", handle.document_key.as_str())])
            .send()
            .await
            .map_err(|e| TranslationError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(|e| TranslationError::NetworkError {
            message: e.to_string(),
        })?;
        serde_json::from_slice(&body).map_err(|e| TranslationError::InvalidResponseError {
            message: format!("status response: {e}"),
        })
    }

    /// Poll until the service reports `done` or the attempt budget runs out.
    ///
    /// Failed attempts of any kind are retried; each one uses up budget.
    pub async fn wait_until_done(&self, job: &mut TranslationJob) -> Result<()> {
        let handle = job.document.clone().ok_or_else(|| {
            TranslationError::InternalError("cannot poll a job that was never submitted".to_string())
        })?;
        let max_attempts = self.config.max_poll_attempts;
        let interval = self.config.poll_interval();

        for attempt in 1..=max_attempts {
            job.poll_attempts = attempt;

            match self.poll_status(&handle).await {
                Ok(status) if status.is_done() => {
                    debug!("Document {} done after {} checks", handle.document_id, attempt);
                    job.status = JobStatus::Done;
                    return Ok(());
                }
                Ok(status) => {
                    job.status = JobStatus::Pending;
                    debug!(
                        "Document {} is {} (attempt {}/{}, ~{:?}s remaining)",
                        handle.document_id,
                        status.status,
                        attempt,
                        max_attempts,
                        status.seconds_remaining
                    );
                    if let Some(message) = &status.error_message {
                        warn!("Service reported for {}: {}", handle.document_id, message);
                    }
                }
                Err(e) => {
                    job.status = JobStatus::Pending;
                    warn!(
                        "Status check {}/{} for {} failed: {}",
                        attempt, max_attempts, handle.document_id, e
                    );
                }
            }

            if attempt < max_attempts {
                sleep(interval).await;
            }
        }

        Err(TranslationError::TimeoutError {
            attempts: max_attempts,
        })
    }

    /// Download the translated document
    pub async fn fetch_result(&self, handle: &DocumentHandle) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(format!(
                "{}/document/{}/result",
                self.config.endpoint(),
                handle.document_id
            ))
            .header("Authorization", self.config.authorization())
            .form(&[("document_key", handle.document_key.as_str())])
            .send()
            .await
            .map_err(|e| TranslationError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(|e| TranslationError::NetworkError {
            message: e.to_string(),
        })?;
        Ok(body.to_vec())
    }
}
