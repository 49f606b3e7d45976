//! Document origins (`scheme://host[:port]`) used to restrict delivery.

use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OriginError {
    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    /// `data:`, `file:` and similar URLs have no tuple origin to match on.
    #[error("URL '{0}' has an opaque origin")]
    Opaque(String),
}

/// Expected origin of the other side of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// `"*"`: accept any sender.
    Any,
    /// Serialized tuple origin, default port omitted.
    Exact(String),
}

impl Origin {
    /// Parse `"*"` or any URL; only its origin part is kept.
    pub fn parse(input: &str) -> Result<Self, OriginError> {
        if input.trim() == "*" {
            return Ok(Self::Any);
        }
        Self::from_src(input)
    }

    /// Origin of the document a frame `src` points at.
    pub fn from_src(src: &str) -> Result<Self, OriginError> {
        let url = Url::parse(src.trim()).map_err(|e| OriginError::InvalidUrl {
            input: src.to_string(),
            reason: e.to_string(),
        })?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(OriginError::Opaque(src.to_string()));
        }
        Ok(Self::Exact(origin.ascii_serialization()))
    }

    /// Whether a message stamped with `received` passes this filter.
    #[must_use]
    pub fn matches(&self, received: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == received,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => "*",
            Self::Exact(origin) => origin,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
