//! Initial columns taken directly from the base table

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An output column sourced directly from the base table
///
/// The alias is the column's identity within a query. Uniqueness is
/// expected but not enforced: lookups by alias resolve to the first match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialColumn {
    /// Output alias
    pub alias: String,

    /// Optional human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Source column id on the base table (or a joined table)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Join path from the base table to the source column
    ///
    /// Each hop is a `[from_column, to_column]` pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jp_path: Option<Vec<Vec<i64>>>,

    /// Any other source-column fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InitialColumn {
    /// Create a column with only an alias
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            display_name: None,
            id: None,
            jp_path: None,
            extra: Map::new(),
        }
    }

    /// Set display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set source column id
    pub fn with_source_column(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Set join path
    pub fn with_join_path(mut self, jp_path: Vec<Vec<i64>>) -> Self {
        self.jp_path = Some(jp_path);
        self
    }

    /// Label to show for this column: display name if set, alias otherwise
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.alias)
    }
}
