//! Request outcome codes reported by workers.

use std::fmt;

/// The error code attached to a failed fetch, as recorded in
/// `statuslast50req:{domain}` and the per-code error counters.
///
/// Benign codes mean the source itself answered correctly and only the image
/// was unusable; they are counted but never fed into the sliding windows or
/// the circuit breakers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// An HTTP status code, e.g. `500`.
    Http(u16),
    /// The image payload could not be decoded.
    UnidentifiedImage,
}

impl ErrorCode {
    /// Whether this code is excluded from rate limiting.
    ///
    /// A 404 or an undecodable image is the image's fault, not the source's;
    /// throttling the domain for it would punish a healthy server.
    pub fn is_benign(&self) -> bool {
        matches!(self, ErrorCode::Http(404) | ErrorCode::UnidentifiedImage)
    }

    /// Whether this code encodes a server-side failure.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ErrorCode::Http(code) if *code >= 500)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Http(code) => write!(f, "{code}"),
            ErrorCode::UnidentifiedImage => write!(f, "UnidentifiedImageError"),
        }
    }
}
