use thiserror::Error;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["mp3", "wav", "m4a"];
pub const MIN_UPLOAD_BYTES: usize = 1024;
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Reasons an upload is rejected before any transcoding happens.
/// The display text is returned to the client verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Only audio files are supported (MP3, WAV, M4A)")]
    UnsupportedType,
    #[error("File too small")]
    TooSmall,
    #[error("File too large")]
    TooLarge,
}

pub fn has_allowed_extension(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Check the declared filename first, then the payload size.
pub fn validate_upload(filename: Option<&str>, data: &[u8]) -> Result<(), UploadError> {
    match filename {
        Some(name) if has_allowed_extension(name) => {}
        _ => return Err(UploadError::UnsupportedType),
    }

    if data.len() < MIN_UPLOAD_BYTES {
        return Err(UploadError::TooSmall);
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge);
    }

    Ok(())
}
