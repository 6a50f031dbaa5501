use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building and publishing a site
#[derive(Error, Debug)]
pub enum SyncError {
    /// A local file could not be opened while preparing its upload
    #[error("Failed to prepare {path}: {source}")]
    Preparation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The generated output directory does not exist
    #[error("Output directory not found: {path}")]
    OutputDirMissing { path: PathBuf },

    /// S3 access denied
    #[error("S3 access denied for bucket '{bucket}': {message}")]
    S3AccessDenied { bucket: String, message: String },

    /// Any other failure reported while transferring an object
    #[error("Upload of '{key}' failed: {message}")]
    Transport { key: String, message: String },

    /// Cloning the source repository failed
    #[error("git clone of {repo} failed: {message}")]
    Clone { repo: String, message: String },

    /// The static-site generator failed
    #[error("{program} failed: {message}")]
    Generator { program: String, message: String },

    /// An upload worker task died before finishing
    #[error("Upload worker failed: {0}")]
    Worker(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Create a transport error from an AWS SDK error
    pub fn from_aws_error<E: std::fmt::Display>(bucket: &str, key: &str, error: E) -> Self {
        let error_str = error.to_string();
        if error_str.to_lowercase().contains("access denied")
            || error_str.to_lowercase().contains("forbidden")
        {
            Self::S3AccessDenied {
                bucket: bucket.to_string(),
                message: error_str,
            }
        } else {
            Self::Transport {
                key: key.to_string(),
                message: error_str,
            }
        }
    }

    /// Whether the failure came from preparing a local file rather than from S3
    #[cfg(test)]
    pub fn is_preparation(&self) -> bool {
        matches!(self, Self::Preparation { .. })
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::Preparation { path, source } => {
                format!(
                    "Could not read {}: {}\n\nPossible solutions:\n  \
                     1. Check the generator did not remove files while publishing\n  \
                     2. Check file permissions: ls -l {}",
                    path.display(),
                    source,
                    path.display()
                )
            }
            Self::OutputDirMissing { path } => {
                format!(
                    "Output directory not found: {}\n\nPossible solutions:\n  \
                     1. Make sure the generator writes to the 'public' directory\n  \
                     2. Pass an existing directory with --output-dir",
                    path.display()
                )
            }
            Self::S3AccessDenied { bucket, message } => {
                format!(
                    "Access denied for bucket '{}': {}\n\nPossible solutions:\n  \
                     1. Check your AWS credentials: aws sts get-caller-identity\n  \
                     2. Verify the role may call s3:PutObject on the bucket\n  \
                     3. Ensure bucket exists: aws s3 ls s3://{}\n  \
                     4. Check S3_REGION matches the bucket region",
                    bucket, message, bucket
                )
            }
            Self::Transport { key, message } => {
                format!(
                    "Upload of '{}' failed: {}\n\nPossible solutions:\n  \
                     1. Check your internet connection\n  \
                     2. Verify S3_REGION is correct\n  \
                     3. Try again with --max-concurrent 1",
                    key, message
                )
            }
            Self::Clone { repo, message } => {
                format!(
                    "git clone of {} failed: {}\n\nPossible solutions:\n  \
                     1. Check GIT_REPO points to a reachable repository\n  \
                     2. Make sure git is installed and on PATH",
                    repo, message
                )
            }
            Self::Generator { program, message } => {
                format!(
                    "{} failed: {}\n\nPossible solutions:\n  \
                     1. Check HUGO_BIN points to an executable hugo binary\n  \
                     2. Run the generator locally against the repository",
                    program, message
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for publish operations
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_aws_error_access_denied() {
        let err = SyncError::from_aws_error("my-site", "/index.html", "AccessDenied: Access Denied");
        assert!(matches!(err, SyncError::S3AccessDenied { ref bucket, .. } if bucket == "my-site"));

        let err = SyncError::from_aws_error("my-site", "/index.html", "403 Forbidden");
        assert!(matches!(err, SyncError::S3AccessDenied { .. }));
    }

    #[test]
    fn test_from_aws_error_transport() {
        let err = SyncError::from_aws_error("my-site", "/style.css", "dispatch failure");
        match err {
            SyncError::Transport { key, message } => {
                assert_eq!(key, "/style.css");
                assert_eq!(message, "dispatch failure");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_preparation_error_display() {
        let err = SyncError::Preparation {
            path: PathBuf::from("/tmp/blog/public/gone.html"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.is_preparation());
        assert_eq!(
            err.to_string(),
            "Failed to prepare /tmp/blog/public/gone.html: not found"
        );
        assert!(err.user_message().contains("Possible solutions"));
    }
}
