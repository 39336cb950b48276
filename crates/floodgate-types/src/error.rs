use thiserror::Error;

/// Errors surfaced by shared-store adapters.
///
/// Store failures are treated as transient by callers: worker-side reporters
/// retry with backoff and then log a degraded signal, the regulator logs and
/// skips to the next source. Nothing in the control plane crashes on these.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store command failed: {0}")]
    Command(String),

    #[error("unexpected value at {key}: {reason}")]
    Encoding { key: String, reason: String },
}

impl StoreError {
    pub fn encoding(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encoding {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
