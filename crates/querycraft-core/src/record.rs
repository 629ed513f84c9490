//! Serialized record shapes
//!
//! These are the plain wire/persistence forms of a query. Every diff emitted
//! by a model mutator is a [`QueryRecordPatch`], which is always a subset of
//! the [`QueryRecord`] the model serializes to.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::column::InitialColumn;
use crate::error::QueryModelError;

/// Identifier of a persisted query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(pub i64);

impl From<i64> for QueryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the base table a query is built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(pub i64);

impl From<i64> for TableId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serialized transformation step
///
/// The discriminant and payload are kept as raw JSON, exactly as given, so
/// records with an unrecognised, non-string or missing `type` still parse
/// and reach the dispatcher. An explicit `null` is kept apart from an
/// absent key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationRecord {
    /// Discriminant (`"filter"`, `"summarization"`, ...)
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "raw_value"
    )]
    pub kind: Option<Value>,

    /// Variant-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "raw_value")]
    pub spec: Option<Value>,

    /// Any other top-level keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransformationRecord {
    /// Create a record with a discriminant and payload
    pub fn new(kind: impl Into<String>, spec: Value) -> Self {
        Self {
            kind: Some(Value::String(kind.into())),
            spec: Some(spec),
            extra: Map::new(),
        }
    }

    /// Add an extra top-level key
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Discriminant, when it is a string
    pub fn discriminant(&self) -> Option<&str> {
        self.kind.as_ref().and_then(Value::as_str)
    }

    /// Discriminant as written, for messages
    pub fn describe_kind(&self) -> String {
        match &self.kind {
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => other.to_string(),
            None => "(missing)".to_string(),
        }
    }
}

/// Full serialized query record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QueryId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_table: Option<TableId>,

    /// Display-ordered initial columns; `null` reads as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub initial_columns: Vec<InitialColumn>,

    /// Execution-ordered pipeline; `None` means no pipeline was given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformations: Option<Vec<TransformationRecord>>,
}

impl QueryRecord {
    /// Parse a record from a JSON string
    pub fn from_json(json: &str) -> Result<Self, QueryModelError> {
        serde_json::from_str(json).map_err(|e| QueryModelError::Parse(e.to_string()))
    }

    /// Serialize to a compact JSON string
    pub fn to_json(&self) -> Result<String, QueryModelError> {
        serde_json::to_string(self).map_err(|e| QueryModelError::Serialize(e.to_string()))
    }

    /// Serialize to a pretty-printed JSON string
    pub fn to_json_pretty(&self) -> Result<String, QueryModelError> {
        serde_json::to_string_pretty(self).map_err(|e| QueryModelError::Serialize(e.to_string()))
    }

    /// Overlay a patch onto this record, returning the merged record
    ///
    /// Fields absent from the patch are kept. An explicit null clears the
    /// field.
    pub fn merge(&self, patch: &QueryRecordPatch) -> QueryRecord {
        let mut merged = self.clone();

        if let Some(id) = patch.id {
            merged.id = id;
        }
        if let Some(name) = &patch.name {
            merged.name = name.clone();
        }
        if let Some(base_table) = patch.base_table {
            merged.base_table = base_table;
        }
        if let Some(initial_columns) = &patch.initial_columns {
            merged.initial_columns = initial_columns.clone();
        }
        if let Some(transformations) = &patch.transformations {
            merged.transformations = transformations.clone();
        }

        merged
    }
}

/// Partial query record carried by an update diff
///
/// Nullable fields are tri-state: `None` means "not part of this diff",
/// `Some(None)` means "set to null", `Some(Some(v))` means "set to v".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub id: Option<Option<QueryId>>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub name: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub base_table: Option<Option<TableId>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_columns: Option<Vec<InitialColumn>>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub transformations: Option<Option<Vec<TransformationRecord>>>,
}

impl QueryRecordPatch {
    /// Patch touching only `id`
    pub fn id(id: Option<QueryId>) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Patch touching only `name`
    pub fn name(name: Option<String>) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    /// Patch touching only `base_table`
    pub fn base_table(base_table: Option<TableId>) -> Self {
        Self {
            base_table: Some(base_table),
            ..Self::default()
        }
    }

    /// Patch touching only `initial_columns`
    pub fn initial_columns(initial_columns: Vec<InitialColumn>) -> Self {
        Self {
            initial_columns: Some(initial_columns),
            ..Self::default()
        }
    }

    /// Patch touching only `transformations`
    pub fn transformations(transformations: Option<Vec<TransformationRecord>>) -> Self {
        Self {
            transformations: Some(transformations),
            ..Self::default()
        }
    }

    /// Names of the serialized fields this patch carries
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.id.is_some() {
            fields.push("id");
        }
        if self.name.is_some() {
            fields.push("name");
        }
        if self.base_table.is_some() {
            fields.push("base_table");
        }
        if self.initial_columns.is_some() {
            fields.push("initial_columns");
        }
        if self.transformations.is_some() {
            fields.push("transformations");
        }
        fields
    }

    /// Check if the patch carries no fields
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

/// Deserialize a present field (even `null`) as `Some`
///
/// Absence is left to `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Keep any present JSON value, including `null`, verbatim
fn raw_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Read `null` as an empty list
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_default() {
        let record = QueryRecord::from_json("{}").unwrap();
        assert_eq!(record, QueryRecord::default());
        assert!(record.initial_columns.is_empty());
        assert!(record.transformations.is_none());

        let record = QueryRecord::from_json(r#"{ "name": "x", "initial_columns": null }"#).unwrap();
        assert_eq!(record.name.as_deref(), Some("x"));
        assert!(record.initial_columns.is_empty());
    }

    #[test]
    fn absent_fields_are_omitted() {
        let record = QueryRecord {
            name: Some("Checkouts".to_string()),
            ..QueryRecord::default()
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "name": "Checkouts", "initial_columns": [] })
        );
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = QueryRecord::from_json("{ \"initial_columns\": 4 }").unwrap_err();
        assert!(matches!(err, QueryModelError::Parse(_)));
    }

    #[test]
    fn transformation_record_keeps_unknown_kind_and_extras() {
        let raw = json!({ "type": "bogus", "spec": { "x": 1 }, "display_name": "Mystery" });
        let record: TransformationRecord = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(record.discriminant(), Some("bogus"));
        assert_eq!(record.extra.get("display_name"), Some(&json!("Mystery")));
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn transformation_record_accepts_any_type_value() {
        let json = r#"{ "transformations": [{ "type": 3, "spec": {} }, { "spec": {} }] }"#;
        let record = QueryRecord::from_json(json).unwrap();
        let transformations = record.transformations.unwrap();

        assert_eq!(transformations[0].kind, Some(json!(3)));
        assert_eq!(transformations[0].discriminant(), None);
        assert_eq!(transformations[0].describe_kind(), "3");
        assert_eq!(transformations[1].kind, None);
        assert_eq!(transformations[1].describe_kind(), "(missing)");
        assert_eq!(serde_json::to_value(&transformations[1]).unwrap(), json!({ "spec": {} }));
    }

    #[test]
    fn transformation_record_keeps_explicit_nulls() {
        for raw in [
            json!({ "type": "filter", "spec": null }),
            json!({ "type": null }),
            json!({ "type": "filter" }),
        ] {
            let record: TransformationRecord = serde_json::from_value(raw.clone()).unwrap();
            assert_eq!(serde_json::to_value(&record).unwrap(), raw);
        }
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let cleared = QueryRecordPatch::base_table(None);
        assert_eq!(serde_json::to_value(&cleared).unwrap(), json!({ "base_table": null }));

        let parsed: QueryRecordPatch =
            serde_json::from_value(json!({ "base_table": null })).unwrap();
        assert_eq!(parsed, cleared);

        let empty: QueryRecordPatch = serde_json::from_value(json!({})).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn merge_overlays_present_fields_only() {
        let stored = QueryRecord {
            id: Some(QueryId(3)),
            name: Some("Old".to_string()),
            base_table: Some(TableId(9)),
            initial_columns: vec![InitialColumn::new("a")],
            transformations: Some(Vec::new()),
        };

        let merged = stored.merge(&QueryRecordPatch::name(Some("New".to_string())));
        assert_eq!(merged.name.as_deref(), Some("New"));
        assert_eq!(merged.base_table, Some(TableId(9)));
        assert_eq!(merged.initial_columns, stored.initial_columns);

        let cleared = stored.merge(&QueryRecordPatch::base_table(None));
        assert_eq!(cleared.base_table, None);
        assert_eq!(cleared.id, Some(QueryId(3)));
    }
}
