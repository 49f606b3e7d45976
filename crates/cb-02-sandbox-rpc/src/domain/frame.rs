//! The sandboxed frame a host connects to.

use super::origin::{Origin, OriginError};
use super::sandbox::SandboxPolicy;
use shared_types::FrameId;

/// An embedded, sandboxed child document.
///
/// The only constructors take a [`SandboxPolicy`], so the frame's sandbox
/// attribute is always one that passed policy validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxedFrame {
    id: FrameId,
    src: String,
    origin: Origin,
    sandbox: SandboxPolicy,
}

impl SandboxedFrame {
    /// Frame with the default sandbox policy.
    pub fn new(id: impl Into<FrameId>, src: &str) -> Result<Self, OriginError> {
        Self::with_sandbox(id, src, SandboxPolicy::default())
    }

    pub fn with_sandbox(
        id: impl Into<FrameId>,
        src: &str,
        sandbox: SandboxPolicy,
    ) -> Result<Self, OriginError> {
        Ok(Self {
            id: id.into(),
            origin: Origin::from_src(src)?,
            src: src.to_string(),
            sandbox,
        })
    }

    pub fn id(&self) -> &FrameId {
        &self.id
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    /// Origin derived from `src`.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn sandbox(&self) -> &SandboxPolicy {
        &self.sandbox
    }

    pub fn sandbox_attribute(&self) -> String {
        self.sandbox.attribute()
    }
}
