mod data;
mod fundamentals;
mod market;

pub use data::*;
pub use fundamentals::*;
pub use market::*;

pub mod write;
pub use write::*;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading cached market data from disk.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },
    #[error("{path} holds no usable rows")]
    Empty { path: PathBuf },
    #[error("{path} is not a JSON object")]
    NotAnObject { path: PathBuf },
}
