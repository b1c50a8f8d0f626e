use thiserror::Error;

/// Failure to coerce a warehouse row into a typed record.
///
/// The warehouse returns loosely-typed tabular data; conversion into
/// [`crate::PatientRecord`] fails fast on missing or malformed columns
/// instead of letting untyped values leak inward.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing column `{0}` in warehouse row")]
    MissingColumn(&'static str),

    #[error("malformed value `{value}` for column `{column}`")]
    Malformed { column: &'static str, value: String },
}
