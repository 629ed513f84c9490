//! The immutable query model and its update-diff protocol
//!
//! A [`QueryModel`] is never changed in place. Every mutator returns a
//! [`QueryModelUpdate`]: the new model, the facet that changed, and the
//! partial serialized payload describing the change.
//!
//! There are two construction paths and they stay separate:
//! - [`QueryModel::from_record`] takes serialized input and dispatches every
//!   transformation record to a typed step.
//! - [`QueryModel::from_model`] copies an existing model. Its typed steps are
//!   shared, not re-dispatched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::column::InitialColumn;
use crate::record::{QueryId, QueryRecord, QueryRecordPatch, TableId, TransformationRecord};
use crate::transformation::{dispatch_transformation, TransformationStep};

/// Which facet of a model an update touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateKind {
    Id,
    Name,
    BaseTable,
    InitialColumnsArray,
    InitialColumnName,
    Transformations,
}

impl UpdateKind {
    /// Stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::BaseTable => "baseTable",
            Self::InitialColumnsArray => "initialColumnsArray",
            Self::InitialColumnName => "initialColumnName",
            Self::Transformations => "transformations",
        }
    }
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a model mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryModelUpdate {
    /// Newly produced model
    pub model: QueryModel,

    /// Facet that changed
    #[serde(rename = "type")]
    pub kind: UpdateKind,

    /// Changed field(s) in serialized shape
    pub diff: QueryRecordPatch,
}

impl QueryModelUpdate {
    fn new(model: QueryModel, kind: UpdateKind, diff: QueryRecordPatch) -> Self {
        tracing::trace!(kind = %kind, fields = ?diff.fields(), "query model updated");
        Self { model, kind, diff }
    }
}

/// A query being assembled: base table, initial columns and a pipeline of
/// transformation steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "QueryRecord", into = "QueryRecord")]
pub struct QueryModel {
    id: Option<QueryId>,
    name: Option<String>,
    base_table: Option<TableId>,
    initial_columns: Vec<InitialColumn>,
    transformation_models: Vec<Arc<TransformationStep>>,
}

impl QueryModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a serialized record, dispatching each transformation
    pub fn from_record(record: &QueryRecord) -> Self {
        let transformation_models = record
            .transformations
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|t| Arc::new(dispatch_transformation(t)))
            .collect();

        Self {
            id: record.id,
            name: record.name.clone(),
            base_table: record.base_table,
            initial_columns: record.initial_columns.clone(),
            transformation_models,
        }
    }

    /// Copy an existing model, sharing its transformation steps
    pub fn from_model(model: &QueryModel) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            base_table: model.base_table,
            initial_columns: model.initial_columns.clone(),
            transformation_models: model.transformation_models.iter().map(Arc::clone).collect(),
        }
    }

    pub fn id(&self) -> Option<QueryId> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn base_table(&self) -> Option<TableId> {
        self.base_table
    }

    /// Initial columns in display order
    pub fn initial_columns(&self) -> &[InitialColumn] {
        &self.initial_columns
    }

    /// Transformation steps in execution order
    pub fn transformation_models(&self) -> &[Arc<TransformationStep>] {
        &self.transformation_models
    }

    /// Find the first initial column with the given alias
    pub fn get_column(&self, alias: &str) -> Option<&InitialColumn> {
        self.initial_columns.iter().find(|c| c.alias == alias)
    }

    /// Change the base table
    ///
    /// Initial columns and transformations reference the old base table, so
    /// the new model keeps only `id` and `name`.
    pub fn with_base_table(&self, base_table: Option<TableId>) -> QueryModelUpdate {
        let model = Self::from_record(&QueryRecord {
            id: self.id,
            name: self.name.clone(),
            base_table,
            ..QueryRecord::default()
        });

        QueryModelUpdate::new(
            model,
            UpdateKind::BaseTable,
            QueryRecordPatch::base_table(base_table),
        )
    }

    pub fn with_id(&self, id: QueryId) -> QueryModelUpdate {
        let model = Self {
            id: Some(id),
            ..Self::from_model(self)
        };

        QueryModelUpdate::new(model, UpdateKind::Id, QueryRecordPatch::id(Some(id)))
    }

    pub fn with_name(&self, name: impl Into<String>) -> QueryModelUpdate {
        let name = name.into();
        let model = Self {
            name: Some(name.clone()),
            ..Self::from_model(self)
        };

        QueryModelUpdate::new(model, UpdateKind::Name, QueryRecordPatch::name(Some(name)))
    }

    /// Append a column at the end
    pub fn with_column(&self, column: InitialColumn) -> QueryModelUpdate {
        let mut initial_columns = self.initial_columns.clone();
        initial_columns.push(column);

        self.with_initial_columns(initial_columns, UpdateKind::InitialColumnsArray)
    }

    /// Remove every column with the given alias
    pub fn without_column(&self, alias: &str) -> QueryModelUpdate {
        let initial_columns = self
            .initial_columns
            .iter()
            .filter(|c| c.alias != alias)
            .cloned()
            .collect();

        self.with_initial_columns(initial_columns, UpdateKind::InitialColumnsArray)
    }

    /// Set the display name of every column with the given alias
    pub fn with_display_name_for_column(
        &self,
        alias: &str,
        display_name: impl Into<String>,
    ) -> QueryModelUpdate {
        let display_name = display_name.into();
        let initial_columns = self
            .initial_columns
            .iter()
            .map(|c| {
                if c.alias == alias {
                    InitialColumn {
                        display_name: Some(display_name.clone()),
                        ..c.clone()
                    }
                } else {
                    c.clone()
                }
            })
            .collect();

        self.with_initial_columns(initial_columns, UpdateKind::InitialColumnName)
    }

    /// Replace the pipeline from serialized records
    ///
    /// The diff echoes `transformations` exactly as given.
    pub fn with_transformations(
        &self,
        transformations: Option<Vec<TransformationRecord>>,
    ) -> QueryModelUpdate {
        let model = Self::from_record(&QueryRecord {
            transformations: transformations.clone(),
            ..self.to_seed()
        });

        QueryModelUpdate::new(
            model,
            UpdateKind::Transformations,
            QueryRecordPatch::transformations(transformations),
        )
    }

    /// Replace the pipeline with already-typed steps
    ///
    /// Unlike [`Self::with_transformations`], the diff is re-serialized from
    /// the new model rather than echoed from the input.
    pub fn with_transformation_models(
        &self,
        transformation_models: Option<Vec<Arc<TransformationStep>>>,
    ) -> QueryModelUpdate {
        let model = Self {
            transformation_models: transformation_models.unwrap_or_default(),
            ..Self::from_model(self)
        };
        let transformations = model.to_record().transformations;

        QueryModelUpdate::new(
            model,
            UpdateKind::Transformations,
            QueryRecordPatch::transformations(transformations),
        )
    }

    /// Full serialized record
    pub fn to_record(&self) -> QueryRecord {
        QueryRecord {
            transformations: Some(
                self.transformation_models.iter().map(|t| t.to_record()).collect(),
            ),
            ..self.to_seed()
        }
    }

    fn with_initial_columns(
        &self,
        initial_columns: Vec<InitialColumn>,
        kind: UpdateKind,
    ) -> QueryModelUpdate {
        let model = Self {
            initial_columns: initial_columns.clone(),
            ..Self::from_model(self)
        };

        QueryModelUpdate::new(model, kind, QueryRecordPatch::initial_columns(initial_columns))
    }

    /// Serialized seed without the pipeline
    fn to_seed(&self) -> QueryRecord {
        QueryRecord {
            id: self.id,
            name: self.name.clone(),
            base_table: self.base_table,
            initial_columns: self.initial_columns.clone(),
            transformations: None,
        }
    }
}

impl From<QueryRecord> for QueryModel {
    fn from(record: QueryRecord) -> Self {
        Self::from_record(&record)
    }
}

impl From<QueryModel> for QueryRecord {
    fn from(model: QueryModel) -> Self {
        model.to_record()
    }
}

impl From<&QueryModel> for QueryRecord {
    fn from(model: &QueryModel) -> Self {
        model.to_record()
    }
}
