//! QueryCraft Core
//!
//! Immutable model of a query being assembled in an editor: a base table,
//! initial columns and an ordered pipeline of transformation steps.
//! Every mutation returns a new model plus a typed diff describing the change
//! in serialized shape.
//! Update kind names and record field names are part of the wire contract.

pub mod column;
pub mod config;
pub mod edit;
pub mod error;
pub mod model;
pub mod record;
pub mod transformation;

pub use column::InitialColumn;
pub use config::{Config, ConfigError, OutputConfig, TransformationConfig};
pub use edit::{apply_edits, QueryEdit};
pub use error::QueryModelError;
pub use model::{QueryModel, QueryModelUpdate, UpdateKind};
pub use record::{QueryId, QueryRecord, QueryRecordPatch, TableId, TransformationRecord};
pub use transformation::{
    dispatch_transformation, validate_transformation_kinds, AggregationExpression,
    FilterTransformation, GroupingExpression, SummarizationSpec, SummarizationTransformation,
    TransformationKind, TransformationStep,
};
