//! CSV loading, feature extraction, exploratory summaries and JSON result
//! writing for the offtask pipeline.

mod describe;
mod domain;
mod error;
mod features;
mod reader;
mod writer;

pub use describe::{ColumnSummary, CorrelationMatrix, KindCounts, correlation_matrix, describe, kind_counts, value_counts};
pub use domain::{Column, ColumnKind, ExperimentName, Table};
pub use error::IoError;
pub use features::{FeatureSet, FeatureSpec, LabelEncoding, drop_all_zero_columns};
pub use reader::TableReader;
pub use writer::{
    ClassRecord, ConfusionRecord, EvaluationRecord, ExploreRecord, FeatureRecord, FoldRecord, ResultWriter,
    RocRecord,
};
