//! Sandbox policy for embedded extension frames.
//!
//! A `SandboxPolicy` can never hold a top-navigation token: parsing rejects
//! them, so every frame built from a policy is unable to navigate the host.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sandbox attribute applied when the configuration does not supply one.
pub const DEFAULT_SANDBOX: &str =
    "allow-forms allow-popups allow-popups-to-escape-sandbox allow-same-origin allow-scripts";

const TOP_NAVIGATION_PREFIX: &str = "allow-top-navigation";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The token would let the frame navigate the host page.
    #[error("Sandbox token '{0}' is forbidden: frames may not navigate the host page")]
    TopNavigationForbidden(String),

    /// Not a sandbox keyword.
    #[error("Invalid sandbox token '{0}'")]
    InvalidToken(String),
}

/// Ordered, duplicate-free list of iframe sandbox tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPolicy {
    tokens: Vec<String>,
}

impl SandboxPolicy {
    /// Parse a whitespace-separated sandbox attribute.
    ///
    /// # Errors
    ///
    /// Rejects any `allow-top-navigation*` token and anything that is not a
    /// lowercase `allow-` keyword.
    pub fn parse(attribute: &str) -> Result<Self, PolicyError> {
        let mut tokens: Vec<String> = Vec::new();
        for token in attribute.split_whitespace() {
            let token = token.to_ascii_lowercase();
            check_token(&token)?;
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        Ok(Self { tokens })
    }

    /// The most restrictive policy (empty attribute).
    #[must_use]
    pub fn locked_down() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Add one more token.
    pub fn allow(mut self, token: &str) -> Result<Self, PolicyError> {
        let token = token.trim().to_ascii_lowercase();
        check_token(&token)?;
        if !self.tokens.contains(&token) {
            self.tokens.push(token);
        }
        Ok(self)
    }

    #[must_use]
    pub fn allows(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// The value to put in the frame's `sandbox` attribute.
    #[must_use]
    pub fn attribute(&self) -> String {
        self.tokens.join(" ")
    }
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            tokens: DEFAULT_SANDBOX.split_whitespace().map(String::from).collect(),
        }
    }
}

impl FromStr for SandboxPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SandboxPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.attribute())
    }
}

fn check_token(token: &str) -> Result<(), PolicyError> {
    if token.starts_with(TOP_NAVIGATION_PREFIX) {
        return Err(PolicyError::TopNavigationForbidden(token.to_string()));
    }
    let keyword = token.strip_prefix("allow-").unwrap_or_default();
    if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_lowercase() || c == '-') {
        return Err(PolicyError::InvalidToken(token.to_string()));
    }
    Ok(())
}
