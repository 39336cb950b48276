//! Canonical domain extraction.
//!
//! Every schema key is scoped to a `{registrable}.{suffix}` domain, never a
//! raw URL. `status60s:staticflickr.com` is valid;
//! `status60s:https://staticflickr.com` is not.

use tracing::warn;
use url::Url;

/// The registrable domain and public-suffix portion of a URL.
///
/// `Tld` is the unit of regulation: token buckets, windows, counters and
/// halt flags are all keyed by [`Tld::key`]. Canonicalisation is
/// deterministic and never fails; input that cannot be reduced to a
/// registrable domain maps to [`Tld::sentinel`] and is logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tld {
    pub domain: String,
    pub suffix: String,
}

impl Tld {
    /// Extracts the canonical domain from a URL or bare host.
    ///
    /// The catalog's `source_url` field is frequently a bare host
    /// (`example.com`); those are retried with an `https://` prefix before
    /// giving up.
    pub fn from_url(raw: &str) -> Self {
        match host_of(raw).as_deref().and_then(split_registrable) {
            Some(tld) => tld,
            None => {
                warn!(url = raw, "could not canonicalise URL, using sentinel domain");
                Self::sentinel()
            }
        }
    }

    /// The domain unparseable input maps to.
    pub fn sentinel() -> Self {
        Self {
            domain: "unknown".to_string(),
            suffix: "invalid".to_string(),
        }
    }

    /// The schema key for this domain, e.g. `staticflickr.com`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.domain, self.suffix)
    }
}

impl std::fmt::Display for Tld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.domain, self.suffix)
    }
}

fn host_of(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| Url::parse(&format!("https://{raw}")).ok())?;
    parsed
        .host_str()
        .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
}

fn split_registrable(host: &str) -> Option<Tld> {
    let registrable = psl::domain_str(host)?;
    let suffix = psl::suffix_str(host)?;
    let label = registrable.strip_suffix(suffix)?.strip_suffix('.')?;
    if label.is_empty() {
        return None;
    }
    Some(Tld {
        domain: label.to_string(),
        suffix: suffix.to_string(),
    })
}
