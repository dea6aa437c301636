/// Convenience result type used across visemix.
pub type VisemixResult<T> = Result<T, VisemixError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum VisemixError {
    /// Timeline ordering invariants were violated (e.g. non-monotonic beats).
    #[error("ordering error: {0}")]
    Ordering(String),

    /// A character, audio clip, mesh or file reference could not be resolved.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A script marker could not be anchored to any beat boundary.
    #[error("marker resolution error: {0}")]
    MarkerResolution(String),

    /// A zero or negative duration/rate where a positive one is required.
    #[error("degenerate timing: {0}")]
    TimingDegenerate(String),

    /// An external tool (renderer, encoder) exited unsuccessfully.
    #[error("{tool} failed with {status}: {stderr}")]
    ExternalTool {
        /// Program name that was invoked.
        tool: String,
        /// Exit status description.
        status: String,
        /// Captured diagnostic output.
        stderr: String,
    },

    /// Invalid user-provided values that are not timing or ordering problems.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VisemixError {
    /// Build a [`VisemixError::Ordering`] value.
    pub fn ordering(msg: impl Into<String>) -> Self {
        Self::Ordering(msg.into())
    }

    /// Build a [`VisemixError::UnresolvedReference`] value.
    pub fn unresolved(msg: impl Into<String>) -> Self {
        Self::UnresolvedReference(msg.into())
    }

    /// Build a [`VisemixError::MarkerResolution`] value.
    pub fn marker(msg: impl Into<String>) -> Self {
        Self::MarkerResolution(msg.into())
    }

    /// Build a [`VisemixError::TimingDegenerate`] value.
    pub fn timing(msg: impl Into<String>) -> Self {
        Self::TimingDegenerate(msg.into())
    }

    /// Build a [`VisemixError::ExternalTool`] value.
    pub fn external_tool(
        tool: impl Into<String>,
        status: impl std::fmt::Display,
        stderr: impl AsRef<[u8]>,
    ) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(stderr.as_ref()).trim().to_string(),
        }
    }

    /// Build a [`VisemixError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`VisemixError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
