//! Error types for babirusa_builder operations.
//!
//! One enum per pipeline component, all wrapped by [`BuilderError`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for babirusa_builder operations
pub type Result<T> = std::result::Result<T, BuilderError>;

/// Main error type for all babirusa_builder operations
#[derive(Error, Debug)]
pub enum BuilderError {
    /// Build root discovery errors
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Build engine errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Artifact extraction errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Release store errors
    #[error("Release store error: {0}")]
    Store(#[from] StoreError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// The run was interrupted before this operation finished
    #[error("Interrupted")]
    Cancelled,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build root discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The build root itself cannot be used
    #[error("Build root {path} is not a readable directory")]
    InvalidRoot {
        /// Root that was requested
        path: PathBuf,
    },
}

/// Build engine invocation errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build engine binary is missing or its daemon is down
    #[error("Build engine unavailable: {reason}")]
    EngineUnavailable {
        /// Reason for the error
        reason: String,
    },

    /// Building the environment failed
    #[error("Failed to build environment '{tag}': {reason}")]
    BuildFailed {
        /// Tag of the environment
        tag: String,
        /// Reason for the error
        reason: String,
    },

    /// Starting the environment failed
    #[error("Failed to start environment '{tag}': {reason}")]
    StartFailed {
        /// Tag of the environment
        tag: String,
        /// Reason for the error
        reason: String,
    },

    /// Destroying the environment failed
    #[error("Failed to destroy environment '{tag}': {reason}")]
    DestroyFailed {
        /// Tag of the environment
        tag: String,
        /// Reason for the error
        reason: String,
    },
}

/// Artifact extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Extraction was attempted before the environment was started
    #[error("Environment '{tag}' is not started")]
    NotStarted {
        /// Tag of the environment
        tag: String,
    },

    /// The artifact does not exist inside the environment
    #[error("'{path}' does not exist inside environment '{tag}'")]
    SourceMissing {
        /// Tag of the environment
        tag: String,
        /// In-environment path
        path: String,
    },

    /// Writing the local copy failed
    #[error("Failed to write artifact to {destination}: {reason}")]
    WriteFailed {
        /// Local destination
        destination: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// The copied artifact is empty
    #[error("Artifact at {destination} is empty (0 bytes)")]
    EmptyArtifact {
        /// Local destination
        destination: PathBuf,
    },
}

/// Remote release store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store rejected the credentials
    #[error("Authentication rejected by release store: {reason}")]
    Unauthorized {
        /// Reason for the error
        reason: String,
    },

    /// Store answered with an unexpected status
    #[error("{operation} failed with HTTP {status}: {body}")]
    Api {
        /// Operation that failed
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Transport level failure
    #[error("{operation} failed: {reason}")]
    Transport {
        /// Operation that failed
        operation: String,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing credentials for uploading
    #[error("Missing credentials: {reason}")]
    MissingCredentials {
        /// Reason for the error
        reason: String,
    },
}

impl BuilderError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            BuilderError::Discovery(DiscoveryError::InvalidRoot { path }) => vec![
                format!("Check that {} exists and is readable", path.display()),
                "Run from the directory containing the platform Dockerfiles or pass --root"
                    .to_string(),
            ],
            BuilderError::Build(BuildError::EngineUnavailable { .. }) => vec![
                "Install Docker: https://docs.docker.com/get-docker/".to_string(),
                "Start the Docker daemon and verify with: docker info".to_string(),
            ],
            BuilderError::Store(StoreError::Unauthorized { .. })
            | BuilderError::Cli(CliError::MissingCredentials { .. }) => vec![
                "Set GH_TOKEN or GITHUB_TOKEN to a token with 'repo' scope".to_string(),
                "Verify the token has write access to the target repository".to_string(),
            ],
            BuilderError::Cli(CliError::InvalidArguments { .. }) => {
                vec!["Run with --help to see accepted arguments".to_string()]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        StoreError::Transport {
            operation: error
                .url()
                .map(|url| url.path().to_string())
                .unwrap_or_else(|| "request".to_string()),
            reason: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Transport {
            operation: "decode response".to_string(),
            reason: error.to_string(),
        }
    }
}
