//! Errors raised while loading, binding and evaluating cuts
//!
//! All of these are configuration problems which abort the run before any
//! output is produced. Bad per-event data is never an error: it simply fails
//! the cut (see `evcut`).

use std::path::PathBuf;

use thiserror::Error;

/// Something is wrong with the cut configuration or the event dataset
#[derive(Debug, Error)]
pub enum CutError {
    /// No row of the bounds table covers the requested run
    #[error("no cut bounds for run {run} in {}", .path.display())]
    ConfigNotFound { run: u32, path: PathBuf },

    /// A cut references a bound symbol that the table does not provide
    #[error("cut {cut} references bound {symbol}, which is not defined for this run")]
    MissingBound { cut: String, symbol: String },

    /// A bound reference asks for something other than `low` or `high`
    #[error("bound reference {symbol}.{field} must use either .low or .high")]
    InvalidBound { symbol: String, field: String },

    /// An expression names a variable that is neither a column nor a bound
    #[error("cut {cut} uses unknown variable {name} in expression `{expression}`")]
    UnknownVariable {
        cut: String,
        name: String,
        expression: String,
    },

    /// A requested cut is not defined by the cut-definition file
    #[error("cut {cut} is not defined in {}", .path.display())]
    UnknownCut { cut: String, path: PathBuf },

    /// An expression or definition line could not be parsed
    #[error("cannot parse `{expression}`: {message}")]
    Syntax { expression: String, message: String },

    /// The event dataset does not match the expected schema
    #[error("malformed event dataset: {0}")]
    Dataset(String),
}
