//! Runtime configuration shared by the `serve` and `recognize` commands.
//!
//! Values come from command-line flags, falling back to environment variables
//! (a `.env` file is loaded before parsing).

use anyhow::{Context, Result};
use clap::Args;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::service::RecognitionService;
use crate::shazam::ShazamClient;
use crate::transcode::FfmpegTranscoder;

#[derive(Args, Debug, Clone)]
pub struct RecognizerConfig {
    /// Shazam-compatible recognition endpoint receiving the transcoded audio
    #[arg(long, env = "SHAZAM_API_URL")]
    pub recognizer_url: String,

    /// Bearer token for the recognition endpoint
    #[arg(long, env = "SHAZAM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Give up on the remote call after this many seconds (unbounded if unset)
    #[arg(long, env = "SHAZAM_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// ffmpeg executable, by name or path
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Local directory searched for ffmpeg before the system PATH
    #[arg(long, env = "FFMPEG_BIN_DIR", default_value = "ffmpegd/bin")]
    pub bin_dir: PathBuf,
}

impl RecognizerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Make the local binary directory visible to child processes.
    /// Must run before the async runtime starts any worker threads.
    pub fn apply_bin_dir(&self) -> Result<()> {
        if prepend_bin_dir(&self.bin_dir)? {
            tracing::info!("Using local binaries from {:?}", self.bin_dir);
        }
        Ok(())
    }

    /// Construct the shared pipeline. Called once at startup.
    pub fn build_service(&self) -> Result<RecognitionService> {
        let transcoder = FfmpegTranscoder::new(self.ffmpeg.clone());
        let recognizer = ShazamClient::new(
            self.recognizer_url.clone(),
            self.api_key.clone(),
            self.timeout(),
        )?;
        match self.timeout() {
            Some(t) => tracing::info!("Recognizer: {} (timeout {:?})", recognizer.endpoint(), t),
            None => tracing::info!("Recognizer: {} (no timeout)", recognizer.endpoint()),
        }

        Ok(RecognitionService::new(
            Arc::new(transcoder),
            Arc::new(recognizer),
        ))
    }
}

/// Put `dir` in front of the process search path if it exists.
/// Returns whether PATH was changed.
pub fn prepend_bin_dir(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    let current = std::env::var_os("PATH");
    let joined = search_path_with(dir, current)?;
    std::env::set_var("PATH", joined);
    Ok(true)
}

fn search_path_with(dir: &Path, current: Option<OsString>) -> Result<OsString> {
    let mut paths = vec![dir.to_path_buf()];
    if let Some(current) = current {
        paths.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(paths).context("Binary directory cannot be added to PATH")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_dir_goes_first() {
        let current = std::env::join_paths(["/usr/bin", "/bin"]).unwrap();
        let joined = search_path_with(Path::new("ffmpegd/bin"), Some(current)).unwrap();
        let parts: Vec<PathBuf> = std::env::split_paths(&joined).collect();
        assert_eq!(
            parts,
            vec![
                PathBuf::from("ffmpegd/bin"),
                PathBuf::from("/usr/bin"),
                PathBuf::from("/bin")
            ]
        );
    }

    #[test]
    fn test_empty_path_yields_only_bin_dir() {
        let joined = search_path_with(Path::new("bin"), None).unwrap();
        assert_eq!(joined, OsString::from("bin"));
    }

    #[test]
    fn test_missing_dir_leaves_path_alone() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(!prepend_bin_dir(&missing).unwrap());
    }

    #[test]
    fn test_bin_dir_applied_separately_from_service_construction() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecognizerConfig {
            recognizer_url: "http://localhost:8000/recognize".to_string(),
            api_key: None,
            timeout_secs: None,
            ffmpeg: PathBuf::from("ffmpeg"),
            bin_dir: dir.path().to_path_buf(),
        };

        let before = std::env::var_os("PATH");
        config.build_service().unwrap();
        assert_eq!(std::env::var_os("PATH"), before);

        config.apply_bin_dir().unwrap();
        let after = std::env::var_os("PATH").unwrap();
        assert_eq!(
            std::env::split_paths(&after).next(),
            Some(dir.path().to_path_buf())
        );
    }

    #[test]
    fn test_timeout_is_optional() {
        let mut config = RecognizerConfig {
            recognizer_url: "http://localhost:8000/recognize".to_string(),
            api_key: None,
            timeout_secs: None,
            ffmpeg: PathBuf::from("ffmpeg"),
            bin_dir: PathBuf::from("ffmpegd/bin"),
        };
        assert_eq!(config.timeout(), None);
        config.timeout_secs = Some(30);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }
}
