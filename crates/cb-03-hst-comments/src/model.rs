//! HST comment payloads.
//!
//! The delivery tier marks page structure with HTML comments whose body is a
//! JSON object. Start markers carry `HST-Type`, end markers carry `HST-End`:
//!
//! ```text
//! <!-- { "HST-Type": "CONTAINER_COMPONENT", "uuid": "c1", "label": "Main" } -->
//!   <!-- { "HST-Type": "CONTAINER_ITEM_COMPONENT", "uuid": "i1" } -->
//!   ...
//!   <!-- { "HST-End": "true", "uuid": "i1" } -->
//! <!-- { "HST-End": "true", "uuid": "c1" } -->
//! ```

use serde_json::{Map, Value};
use std::fmt;

/// Discriminator key of a start marker.
pub const TYPE_KEY: &str = "HST-Type";
/// Discriminator key of an end marker.
pub const END_KEY: &str = "HST-End";

const UUID_KEY: &str = "uuid";
const LABEL_KEY: &str = "label";

/// Kind of structure a start marker opens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HstType {
    Container,
    ContainerItem,
    EditMenuLink,
    ManageContentLink,
    PageMetaData,
    /// A type this crate does not model, kept verbatim.
    Other(String),
}

impl HstType {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "CONTAINER_COMPONENT" => Self::Container,
            "CONTAINER_ITEM_COMPONENT" => Self::ContainerItem,
            "EDIT_MENU_LINK" => Self::EditMenuLink,
            "MANAGE_CONTENT_LINK" => Self::ManageContentLink,
            "PAGE-META-DATA" => Self::PageMetaData,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Container => "CONTAINER_COMPONENT",
            Self::ContainerItem => "CONTAINER_ITEM_COMPONENT",
            Self::EditMenuLink => "EDIT_MENU_LINK",
            Self::ManageContentLink => "MANAGE_CONTENT_LINK",
            Self::PageMetaData => "PAGE-META-DATA",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for HstType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a comment opens or closes a structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HstMarker {
    Start(HstType),
    End,
}

/// A parsed HST comment.
#[derive(Debug, Clone, PartialEq)]
pub struct HstComment {
    marker: HstMarker,
    data: Map<String, Value>,
}

impl HstComment {
    /// Interpret a JSON object as an HST comment.
    ///
    /// Returns `None` when the object carries neither discriminator. An
    /// `HST-End` key wins over `HST-Type` when it is `"true"` or `true`.
    pub fn from_object(data: Map<String, Value>) -> Option<Self> {
        let is_end = match data.get(END_KEY) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
            _ => false,
        };
        let marker = if is_end {
            HstMarker::End
        } else {
            match data.get(TYPE_KEY) {
                Some(Value::String(kind)) => HstMarker::Start(HstType::from_wire(kind)),
                _ => return None,
            }
        };
        Some(Self { marker, data })
    }

    #[must_use]
    pub fn marker(&self) -> &HstMarker {
        &self.marker
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.marker == HstMarker::End
    }

    /// Type of a start marker; `None` for end markers.
    #[must_use]
    pub fn hst_type(&self) -> Option<&HstType> {
        match &self.marker {
            HstMarker::Start(kind) => Some(kind),
            HstMarker::End => None,
        }
    }

    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        self.data.get(UUID_KEY).and_then(Value::as_str)
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.data.get(LABEL_KEY).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The full JSON payload.
    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}
