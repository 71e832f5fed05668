use thiserror::Error;

/// Failures of identity resolution. Being anonymous is not one of them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The authenticated username has no record in the user directory.
    #[error("user '{username}' is authenticated but not present in the user directory")]
    UserNotFound { username: String },
    /// The directory could not be consulted at all.
    #[error("user directory unavailable: {0}")]
    DirectoryUnavailable(String),
}
