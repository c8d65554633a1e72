//! Audio Transcoding Module
//!
//! Converts uploaded audio into the canonical encoding submitted for
//! recognition. The work is delegated to an external `ffmpeg` process.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Target encoding parameters for recognition input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// ffmpeg muxer name, e.g. "mp3"
    pub container: String,
    /// ffmpeg bitrate string, e.g. "192k"
    pub bitrate: String,
}

impl Default for CanonicalFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            container: "mp3".to_string(),
            bitrate: "192k".to_string(),
        }
    }
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Read `input`, write the re-encoded audio to `output`.
    async fn transcode(&self, input: &Path, output: &Path, format: &CanonicalFormat) -> Result<()>;
}

pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    /// `program` is either a bare name resolved through PATH or a full path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_args(input: &Path, output: &Path, format: &CanonicalFormat) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        args.extend(
            [
                "-vn".to_string(),
                "-ar".to_string(),
                format.sample_rate.to_string(),
                "-ac".to_string(),
                format.channels.to_string(),
                "-b:a".to_string(),
                format.bitrate.clone(),
                "-f".to_string(),
                format.container.clone(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, format: &CanonicalFormat) -> Result<()> {
        let result = Command::new(&self.program)
            .args(Self::build_args(input, output, format))
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.program.display()))?;

        if !result.status.success() {
            return Err(anyhow::anyhow!(
                "ffmpeg exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            ));
        }

        tracing::debug!(
            input = %input.display(),
            output = %output.display(),
            "Transcoded upload to canonical format"
        );
        Ok(())
    }
}
