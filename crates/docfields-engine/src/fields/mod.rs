//! # Fields
//!
//! Metadata for the placeholders a document can reference. A [`Field`] links
//! to the document only through its `name`: the text `{{name}}` is the one
//! and only representation of a field inside content. The [`FieldId`] exists
//! purely so the sidebar can address a row while its name is being edited.

pub mod registry;

pub use registry::{CategoryGroup, FieldRegistry, ReconcileOutcome};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Category assigned to names without a `.` prefix
pub const GENERAL_CATEGORY: &str = "general";

/// Category pre-filled in the "add field" form
pub const DEFAULT_NEW_FIELD_CATEGORY: &str = "customer";

/// Opaque, stable identifier for a field row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(Uuid);

impl FieldId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FieldId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of field types offered by the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Email,
    Phone,
    Date,
    Image,
    Url,
}

impl FieldType {
    /// Every type, in the order the type selector lists them
    pub const ALL: [FieldType; 7] = [
        FieldType::String,
        FieldType::Number,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Date,
        FieldType::Image,
        FieldType::Url,
    ];

    /// Lowercase wire name, e.g. `"email"`
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Date => "date",
            FieldType::Image => "image",
            FieldType::Url => "url",
        }
    }

    /// Human label shown next to a field row
    pub fn label(self) -> &'static str {
        match self {
            FieldType::String => "Text",
            FieldType::Number => "Number",
            FieldType::Email => "Email",
            FieldType::Phone => "Phone",
            FieldType::Date => "Date",
            FieldType::Image => "Image",
            FieldType::Url => "URL",
        }
    }

    /// Next type in selector order, wrapping around
    pub fn next(self) -> Self {
        let index = self.position();
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Previous type in selector order, wrapping around
    pub fn prev(self) -> Self {
        let index = self.position();
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown field type: {0}")]
pub struct UnknownFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownFieldType(s.to_string()))
    }
}

/// One placeholder definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub category: String,
    pub placeholder: Option<String>,
}

impl Field {
    /// Field adopted from a `{{name}}` token found in content
    pub fn discovered(name: &str) -> Self {
        Self {
            id: FieldId::new(),
            name: name.to_string(),
            field_type: FieldType::String,
            category: category_for_name(name).to_string(),
            placeholder: Some(name.to_string()),
        }
    }

    /// Text shown as the image `alt` or in the sidebar when no placeholder is set
    pub fn display_text(&self) -> &str {
        self.placeholder.as_deref().unwrap_or(&self.name)
    }
}

/// Category implied by a dotted field name.
///
/// `"invoice.total"` belongs to `"invoice"`; a name without a dot falls into
/// [`GENERAL_CATEGORY`].
pub fn category_for_name(name: &str) -> &str {
    match name.split_once('.') {
        Some((prefix, _)) => prefix,
        None => GENERAL_CATEGORY,
    }
}

/// State of the "add field" form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFieldDraft {
    pub name: String,
    pub field_type: FieldType,
    pub category: String,
    pub placeholder: String,
}

impl NewFieldDraft {
    pub fn with_category(category: &str) -> Self {
        Self {
            name: String::new(),
            field_type: FieldType::String,
            category: category.to_string(),
            placeholder: String::new(),
        }
    }

    /// Build the field this draft describes.
    ///
    /// Returns `None` while the required name or category is still empty.
    pub fn to_field(&self) -> Option<Field> {
        if self.name.is_empty() || self.category.is_empty() {
            return None;
        }

        Some(Field {
            id: FieldId::new(),
            name: self.name.clone(),
            field_type: self.field_type,
            category: self.category.clone(),
            placeholder: Some(self.placeholder.clone()).filter(|p| !p.is_empty()),
        })
    }
}

impl Default for NewFieldDraft {
    fn default() -> Self {
        Self::with_category(DEFAULT_NEW_FIELD_CATEGORY)
    }
}
