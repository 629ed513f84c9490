//! Serializable edit commands
//!
//! An editor drives the model through a script of [`QueryEdit`]s, one per
//! user action. Each edit maps onto exactly one mutator.

use serde::{Deserialize, Serialize};

use crate::column::InitialColumn;
use crate::error::QueryModelError;
use crate::model::{QueryModel, QueryModelUpdate};
use crate::record::{QueryId, TableId, TransformationRecord};
use crate::transformation::validate_transformation_kinds;

/// One user edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryEdit {
    SetId {
        id: QueryId,
    },

    SetName {
        name: String,
    },

    /// Changing the base table drops columns and transformations
    SetBaseTable {
        #[serde(default)]
        base_table: Option<TableId>,
    },

    AddColumn {
        column: InitialColumn,
    },

    RemoveColumn {
        alias: String,
    },

    RenameColumn {
        alias: String,
        display_name: String,
    },

    SetTransformations {
        #[serde(default)]
        transformations: Option<Vec<TransformationRecord>>,
    },
}

impl QueryEdit {
    /// Apply this edit to a model
    pub fn apply(&self, model: &QueryModel) -> QueryModelUpdate {
        match self {
            Self::SetId { id } => model.with_id(*id),
            Self::SetName { name } => model.with_name(name.clone()),
            Self::SetBaseTable { base_table } => model.with_base_table(*base_table),
            Self::AddColumn { column } => model.with_column(column.clone()),
            Self::RemoveColumn { alias } => model.without_column(alias),
            Self::RenameColumn { alias, display_name } => {
                model.with_display_name_for_column(alias, display_name.clone())
            }
            Self::SetTransformations { transformations } => {
                model.with_transformations(transformations.clone())
            }
        }
    }

    /// Strictly check any transformation records this edit carries
    pub fn validate(&self) -> Result<(), QueryModelError> {
        match self {
            Self::SetTransformations { transformations: Some(records) } => {
                validate_transformation_kinds(records)
            }
            _ => Ok(()),
        }
    }

    /// Parse an edit script (a JSON array of edits)
    pub fn script_from_json(json: &str) -> Result<Vec<QueryEdit>, QueryModelError> {
        serde_json::from_str(json).map_err(|e| QueryModelError::Parse(e.to_string()))
    }
}

/// Apply edits in order
///
/// Returns the final model and every update emitted along the way.
pub fn apply_edits(
    model: &QueryModel,
    edits: &[QueryEdit],
) -> (QueryModel, Vec<QueryModelUpdate>) {
    let mut current = model.clone();
    let mut updates = Vec::with_capacity(edits.len());

    for edit in edits {
        let update = edit.apply(&current);
        current = update.model.clone();
        updates.push(update);
    }

    (current, updates)
}
