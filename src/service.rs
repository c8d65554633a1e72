//! Recognition Pipeline
//!
//! Persists an upload to a scratch file, transcodes it, submits the canonical
//! audio to the recognizer and normalizes the answer. Each call owns its own
//! temporary files; nothing is shared between requests except the immutable
//! collaborators held here.

use anyhow::{Context, Result};
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::normalize::{self, Recognition};
use crate::shazam::Recognizer;
use crate::transcode::{CanonicalFormat, Transcoder};

pub struct RecognitionService {
    transcoder: Arc<dyn Transcoder>,
    recognizer: Arc<dyn Recognizer>,
    format: CanonicalFormat,
}

impl RecognitionService {
    pub fn new(transcoder: Arc<dyn Transcoder>, recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            transcoder,
            recognizer,
            format: CanonicalFormat::default(),
        }
    }

    /// Run the pipeline on already-validated bytes.
    ///
    /// Failures are folded into `Recognition::Error` with a
    /// `"Recognition failed: ..."` message; a missing match is `NotFound`.
    pub async fn recognize_bytes(&self, audio: &[u8]) -> Recognition {
        match self.run(audio).await {
            Ok(raw) => {
                let recognition = normalize::normalize(raw.as_ref());
                if matches!(recognition, Recognition::NotFound { .. }) {
                    tracing::info!("No match found for upload");
                }
                recognition
            }
            Err(e) => {
                tracing::error!("Shazam recognition failed: {:#}", e);
                Recognition::error(format!("Recognition failed: {:#}", e))
            }
        }
    }

    async fn run(&self, audio: &[u8]) -> Result<Option<serde_json::Value>> {
        let input = scratch_file(".input")?;
        tokio::fs::write(input.path(), audio)
            .await
            .context("Failed to write upload to temporary file")?;

        let output = scratch_file(".mp3")?;
        let outcome = self.transcode_and_recognize(&input, &output).await;

        discard(input);
        discard(output);
        outcome
    }

    async fn transcode_and_recognize(
        &self,
        input: &NamedTempFile,
        output: &NamedTempFile,
    ) -> Result<Option<serde_json::Value>> {
        self.transcoder
            .transcode(input.path(), output.path(), &self.format)
            .await
            .context("Audio transcoding failed")?;

        self.recognizer.recognize(output.path()).await
    }
}

fn scratch_file(suffix: &str) -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix("recognize-")
        .suffix(suffix)
        .tempfile()
        .context("Failed to create temporary file")
}

// Removal failures are not the caller's problem.
fn discard(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        tracing::debug!("Could not remove temporary file {:?}: {}", path, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Copies the input verbatim and remembers which paths it saw.
    #[derive(Default)]
    struct CopyTranscoder {
        seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl Transcoder for CopyTranscoder {
        async fn transcode(&self, input: &Path, output: &Path, _: &CanonicalFormat) -> Result<()> {
            self.seen
                .lock()
                .unwrap()
                .extend([input.to_path_buf(), output.to_path_buf()]);
            tokio::fs::copy(input, output).await?;
            Ok(())
        }
    }

    struct FailingTranscoder;

    #[async_trait]
    impl Transcoder for FailingTranscoder {
        async fn transcode(&self, _: &Path, _: &Path, _: &CanonicalFormat) -> Result<()> {
            Err(anyhow::anyhow!("unsupported codec"))
        }
    }

    struct FixedRecognizer(Option<Value>);

    #[async_trait]
    impl Recognizer for FixedRecognizer {
        async fn recognize(&self, audio_path: &Path) -> Result<Option<Value>> {
            assert!(audio_path.exists());
            Ok(self.0.clone())
        }
    }

    struct FailingRecognizer;

    #[async_trait]
    impl Recognizer for FailingRecognizer {
        async fn recognize(&self, _: &Path) -> Result<Option<Value>> {
            Err(anyhow::anyhow!("connection reset"))
        }
    }

    #[tokio::test]
    async fn test_match_is_normalized_and_temp_files_removed() {
        let transcoder = Arc::new(CopyTranscoder::default());
        let service = RecognitionService::new(
            transcoder.clone(),
            Arc::new(FixedRecognizer(Some(json!({"track": {"title": "X"}})))),
        );

        let recognition = service.recognize_bytes(&[1u8; 2048]).await;
        match recognition {
            Recognition::Success { result, .. } => assert_eq!(result.title, "X"),
            other => panic!("expected success, got {:?}", other),
        }

        let seen = transcoder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].to_string_lossy().ends_with(".input"));
        assert!(seen[1].to_string_lossy().ends_with(".mp3"));
        for path in seen.iter() {
            assert!(!path.exists(), "{:?} was not cleaned up", path);
        }
    }

    #[tokio::test]
    async fn test_no_match_is_not_found() {
        let service = RecognitionService::new(
            Arc::new(CopyTranscoder::default()),
            Arc::new(FixedRecognizer(None)),
        );
        assert_eq!(
            service.recognize_bytes(&[0u8; 2048]).await,
            Recognition::not_found()
        );
    }

    #[tokio::test]
    async fn test_transcoder_failure_becomes_error_status() {
        let service = RecognitionService::new(
            Arc::new(FailingTranscoder),
            Arc::new(FixedRecognizer(None)),
        );
        match service.recognize_bytes(&[0u8; 2048]).await {
            Recognition::Error { message } => {
                assert!(message.starts_with("Recognition failed:"));
                assert!(message.contains("unsupported codec"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recognizer_failure_becomes_error_status() {
        let service = RecognitionService::new(
            Arc::new(CopyTranscoder::default()),
            Arc::new(FailingRecognizer),
        );
        match service.recognize_bytes(&[0u8; 2048]).await {
            Recognition::Error { message } => assert!(message.contains("connection reset")),
            other => panic!("expected error, got {:?}", other),
        }
    }
}
