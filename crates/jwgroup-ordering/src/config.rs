//! Collection configuration: which table, which column, which subset.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use jwgroup_types::OrderedItem;

/// The position column shared by the built-in collections.
const DEFAULT_POSITION_FIELD: &str = "display_order";

// ---------------------------------------------------------------------------
// CollectionConfig
// ---------------------------------------------------------------------------

/// Where an ordered collection lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionConfig {
    /// Backend table name.
    pub table: String,

    /// Integer column holding the display position.
    ///
    /// Default: `"display_order"`.
    #[serde(default = "default_position_field")]
    pub position_field: String,
}

fn default_position_field() -> String {
    DEFAULT_POSITION_FIELD.to_string()
}

impl CollectionConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            position_field: default_position_field(),
        }
    }

    pub fn with_position_field(mut self, field: impl Into<String>) -> Self {
        self.position_field = field.into();
        self
    }
}

// ---------------------------------------------------------------------------
// CollectionKind
// ---------------------------------------------------------------------------

/// The admin lists that support drag reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Executives,
    Projects,
    Timeline,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [Self::Executives, Self::Projects, Self::Timeline];

    /// Default backend table for this list.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Executives => "executives",
            Self::Projects => "projects",
            Self::Timeline => "timeline_events",
        }
    }

    /// The default [`CollectionConfig`] for this list.
    pub fn config(&self) -> CollectionConfig {
        CollectionConfig::new(self.table())
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Executives => write!(f, "executives"),
            Self::Projects => write!(f, "projects"),
            Self::Timeline => write!(f, "timeline"),
        }
    }
}

// ---------------------------------------------------------------------------
// ViewFilter
// ---------------------------------------------------------------------------

/// Restricts the displayed subset to items whose `field` equals `value`,
/// e.g. projects of one category.
///
/// Filtering only changes what is displayed and how view indices map onto
/// the collection. Positions always describe the full collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewFilter {
    pub field: String,
    pub value: Value,
}

impl ViewFilter {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, item: &OrderedItem) -> bool {
        item.field(&self.field) == Some(&self.value)
    }
}
