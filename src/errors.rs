use thiserror::Error;

#[derive(Debug, Error)]
pub enum WinFsError {
    #[error("Invalid path: {0}")]
    InvalidPathError(String),

    #[error("Invalid handle: the supplied handle cannot be used for backup reads")]
    HandleInvalidError,

    #[error("Unrecognized format: {0}")]
    UnrecognizedFormatError(String),

    #[error("Access denied: the file cannot be opened with backup semantics. Run the application with backup privileges.")]
    PermissionError,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(windows)]
    #[error("Windows error: {0}")]
    WinApiError(#[from] windows::core::Error),

    #[error("Other error: {0}")]
    OtherError(String),
}

impl WinFsError {
    pub(crate) fn invalid_path(reason: &str, path: &str) -> Self {
        WinFsError::InvalidPathError(format!("{reason}: \"{path}\""))
    }
}
