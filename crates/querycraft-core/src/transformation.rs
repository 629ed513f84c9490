//! Transformation pipeline steps and the variant dispatcher
//!
//! A pipeline step is either a row filter or a summarization. The per-kind
//! payload is kept as JSON; the model only relies on the discriminant and on
//! converting to and from [`TransformationRecord`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::QueryModelError;
use crate::record::TransformationRecord;

/// Discriminant written by filter steps
pub const FILTER_DISCRIMINANT: &str = "filter";

/// Discriminant written by summarization steps
pub const SUMMARIZATION_DISCRIMINANT: &str = "summarization";

/// Kind of a transformation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformationKind {
    /// Row filter
    Filter,

    /// Grouping and aggregation
    Summarization,
}

impl TransformationKind {
    /// Serialized discriminant for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => FILTER_DISCRIMINANT,
            Self::Summarization => SUMMARIZATION_DISCRIMINANT,
        }
    }

    /// Strictly recognise a discriminant
    ///
    /// Unlike [`dispatch_transformation`], this returns `None` for anything
    /// that is not exactly one of the two known discriminants.
    pub fn from_discriminant(discriminant: &str) -> Option<Self> {
        match discriminant {
            FILTER_DISCRIMINANT => Some(Self::Filter),
            SUMMARIZATION_DISCRIMINANT => Some(Self::Summarization),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransformationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row filter step
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTransformation {
    condition: Option<Value>,
    extra: Map<String, Value>,
}

impl FilterTransformation {
    /// Create a filter from a condition expression
    pub fn new(condition: Value) -> Self {
        Self {
            condition: Some(condition),
            extra: Map::new(),
        }
    }

    /// Build from a serialized record
    pub fn from_record(record: &TransformationRecord) -> Self {
        Self {
            condition: record.spec.clone(),
            extra: record.extra.clone(),
        }
    }

    /// Condition expression, if the record carried one
    pub fn condition(&self) -> Option<&Value> {
        self.condition.as_ref()
    }

    /// Serialize back to a record
    pub fn to_record(&self) -> TransformationRecord {
        TransformationRecord {
            kind: Some(Value::String(FILTER_DISCRIMINANT.to_string())),
            spec: self.condition.clone(),
            extra: self.extra.clone(),
        }
    }
}

/// A grouping expression in a summarization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingExpression {
    pub input_alias: String,
    pub output_alias: String,

    /// Optional preprocessing function (e.g. truncating a date to its year)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preproc: Option<String>,
}

/// An aggregation expression in a summarization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationExpression {
    pub input_alias: String,
    pub output_alias: String,
    pub function: String,
}

/// Typed view of a summarization payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizationSpec {
    /// Column whose distinct values form the groups
    pub base_grouping_column: String,

    #[serde(default)]
    pub grouping_expressions: Vec<GroupingExpression>,

    #[serde(default)]
    pub aggregation_expressions: Vec<AggregationExpression>,
}

/// Grouping and aggregation step
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizationTransformation {
    spec: Option<Value>,
    extra: Map<String, Value>,
}

impl SummarizationTransformation {
    /// Create a summarization from a typed spec
    pub fn from_spec(spec: &SummarizationSpec) -> Result<Self, QueryModelError> {
        let spec = serde_json::to_value(spec)
            .map_err(|e| QueryModelError::Serialize(e.to_string()))?;

        Ok(Self {
            spec: Some(spec),
            extra: Map::new(),
        })
    }

    /// Build from a serialized record
    ///
    /// Never fails: the payload is kept as-is and only interpreted on demand
    /// by [`Self::parsed_spec`].
    pub fn from_record(record: &TransformationRecord) -> Self {
        Self {
            spec: record.spec.clone(),
            extra: record.extra.clone(),
        }
    }

    /// Raw payload, if the record carried one
    pub fn spec(&self) -> Option<&Value> {
        self.spec.as_ref()
    }

    /// Interpret the payload as a [`SummarizationSpec`]
    pub fn parsed_spec(&self) -> Result<SummarizationSpec, QueryModelError> {
        let spec = self.spec.as_ref().ok_or_else(|| {
            QueryModelError::InvalidTransformationSpec("missing spec".to_string())
        })?;

        SummarizationSpec::deserialize(spec)
            .map_err(|e| QueryModelError::InvalidTransformationSpec(e.to_string()))
    }

    /// Output aliases produced by this step, grouping columns first
    ///
    /// Empty when the payload does not parse.
    pub fn output_aliases(&self) -> Vec<String> {
        match self.parsed_spec() {
            Ok(spec) => spec
                .grouping_expressions
                .iter()
                .map(|g| g.output_alias.clone())
                .chain(spec.aggregation_expressions.iter().map(|a| a.output_alias.clone()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Serialize back to a record
    pub fn to_record(&self) -> TransformationRecord {
        TransformationRecord {
            kind: Some(Value::String(SUMMARIZATION_DISCRIMINANT.to_string())),
            spec: self.spec.clone(),
            extra: self.extra.clone(),
        }
    }
}

/// One stage of the query pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum TransformationStep {
    Filter(FilterTransformation),
    Summarization(SummarizationTransformation),
}

impl TransformationStep {
    /// Kind of this step
    pub fn kind(&self) -> TransformationKind {
        match self {
            Self::Filter(_) => TransformationKind::Filter,
            Self::Summarization(_) => TransformationKind::Summarization,
        }
    }

    /// Serialize to a record
    pub fn to_record(&self) -> TransformationRecord {
        match self {
            Self::Filter(filter) => filter.to_record(),
            Self::Summarization(summarization) => summarization.to_record(),
        }
    }
}

impl From<FilterTransformation> for TransformationStep {
    fn from(filter: FilterTransformation) -> Self {
        Self::Filter(filter)
    }
}

impl From<SummarizationTransformation> for TransformationStep {
    fn from(summarization: SummarizationTransformation) -> Self {
        Self::Summarization(summarization)
    }
}

/// Route a serialized record to its in-memory step
///
/// This is a closed two-way dispatch: `"filter"` builds a filter and every
/// other discriminant, including unknown ones, builds a summarization.
/// Callers that need to reject unknown kinds must run
/// [`validate_transformation_kinds`] before handing records to the model.
pub fn dispatch_transformation(record: &TransformationRecord) -> TransformationStep {
    match record.discriminant() {
        Some(FILTER_DISCRIMINANT) => FilterTransformation::from_record(record).into(),
        Some(SUMMARIZATION_DISCRIMINANT) => SummarizationTransformation::from_record(record).into(),
        _ => {
            tracing::debug!(
                kind = %record.describe_kind(),
                "unrecognised transformation type, dispatching as summarization"
            );
            SummarizationTransformation::from_record(record).into()
        }
    }
}

/// Reject the first record whose discriminant is not a known kind
pub fn validate_transformation_kinds(
    records: &[TransformationRecord],
) -> Result<(), QueryModelError> {
    for (index, record) in records.iter().enumerate() {
        let known = record
            .discriminant()
            .and_then(TransformationKind::from_discriminant)
            .is_some();

        if !known {
            return Err(QueryModelError::UnknownTransformationKind {
                index,
                kind: record.describe_kind(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summarize_record() -> TransformationRecord {
        TransformationRecord::new(
            SUMMARIZATION_DISCRIMINANT,
            json!({
                "base_grouping_column": "author",
                "grouping_expressions": [
                    { "input_alias": "author", "output_alias": "author_group" }
                ],
                "aggregation_expressions": [
                    {
                        "input_alias": "title",
                        "output_alias": "titles",
                        "function": "distinct_aggregate_to_array"
                    }
                ]
            }),
        )
    }

    #[test]
    fn filter_discriminant_dispatches_to_filter() {
        let record = TransformationRecord::new(
            "filter",
            json!({ "lesser": [{ "column_name": ["age"] }, { "literal": [30] }] }),
        );
        let step = dispatch_transformation(&record);

        assert_eq!(step.kind(), TransformationKind::Filter);
        assert_eq!(step.to_record(), record);
    }

    #[test]
    fn unknown_discriminant_falls_back_to_summarization() {
        // Intentional: there is no "unknown kind" state in the dispatcher.
        let record = TransformationRecord::new("bogus", json!({}));
        let step = dispatch_transformation(&record);

        assert_eq!(step.kind(), TransformationKind::Summarization);
        assert_eq!(step.to_record().discriminant(), Some(SUMMARIZATION_DISCRIMINANT));
    }

    #[test]
    fn non_string_or_missing_type_falls_back_to_summarization() {
        let numeric: TransformationRecord =
            serde_json::from_value(json!({ "type": 3, "spec": {} })).unwrap();
        let missing: TransformationRecord = serde_json::from_value(json!({ "spec": {} })).unwrap();

        for record in [numeric, missing] {
            let step = dispatch_transformation(&record);
            assert_eq!(step.kind(), TransformationKind::Summarization);
            assert_eq!(step.to_record().spec, Some(json!({})));
        }
    }

    #[test]
    fn filter_keeps_explicit_null_spec() {
        let record: TransformationRecord =
            serde_json::from_value(json!({ "type": "filter", "spec": null })).unwrap();
        let step = dispatch_transformation(&record);

        assert_eq!(step.to_record(), record);
        assert_eq!(
            serde_json::to_value(step.to_record()).unwrap(),
            json!({ "type": "filter", "spec": null })
        );
    }

    #[test]
    fn summarization_spec_parses() {
        let step = dispatch_transformation(&summarize_record());
        let TransformationStep::Summarization(summarization) = step else {
            panic!("expected summarization");
        };

        let spec = summarization.parsed_spec().unwrap();
        assert_eq!(spec.base_grouping_column, "author");
        assert_eq!(summarization.output_aliases(), vec!["author_group", "titles"]);
    }

    #[test]
    fn malformed_summarization_spec_is_reported_lazily() {
        let record = TransformationRecord::new("bogus", json!([1, 2]));
        let summarization = SummarizationTransformation::from_record(&record);

        assert!(matches!(
            summarization.parsed_spec(),
            Err(QueryModelError::InvalidTransformationSpec(_))
        ));
        assert!(summarization.output_aliases().is_empty());
    }

    #[test]
    fn summarization_from_spec_round_trips() {
        let spec = SummarizationSpec {
            base_grouping_column: "year".to_string(),
            grouping_expressions: vec![GroupingExpression {
                input_alias: "published".to_string(),
                output_alias: "year".to_string(),
                preproc: Some("truncate_to_year".to_string()),
            }],
            aggregation_expressions: Vec::new(),
        };

        let summarization = SummarizationTransformation::from_spec(&spec).unwrap();
        assert_eq!(summarization.parsed_spec().unwrap(), spec);
    }

    #[test]
    fn strict_validation_names_the_offending_record() {
        let records = vec![
            TransformationRecord::new("filter", json!({})),
            TransformationRecord::new("summarization", json!({})),
            TransformationRecord::new("bogus", json!({})),
        ];

        match validate_transformation_kinds(&records) {
            Err(QueryModelError::UnknownTransformationKind { index, kind }) => {
                assert_eq!(index, 2);
                assert_eq!(kind, "bogus");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(validate_transformation_kinds(&records[..2]).is_ok());

        let untyped: TransformationRecord = serde_json::from_value(json!({ "spec": {} })).unwrap();
        match validate_transformation_kinds(&[untyped]) {
            Err(QueryModelError::UnknownTransformationKind { index, kind }) => {
                assert_eq!(index, 0);
                assert_eq!(kind, "(missing)");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn kind_display() {
        assert_eq!(TransformationKind::Filter.to_string(), "filter");
        assert_eq!(
            TransformationKind::from_discriminant("summarization"),
            Some(TransformationKind::Summarization)
        );
        assert_eq!(TransformationKind::from_discriminant("summarize"), None);
    }
}
