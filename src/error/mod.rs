mod bq_error;
mod parser;

use thiserror::Error;

pub use bq_error::{BigQueryError, QueryErrorLocation};
pub use parser::{parse_bq_error, ErrorContext};

#[derive(Error, Debug)]
pub enum BqvError {
    #[error("BigQuery error: {0}")]
    BigQuery(#[from] BigQueryError),

    #[error("Failed to create bigquery client: {0}")]
    Client(#[source] Box<BqvError>),

    #[error("Failed to read views: {0}")]
    ConfigRead(String),

    #[error("Failed to load params: {0}")]
    ParamLoad(String),

    #[error("Template error in {dataset}.{view}: parameter '{name}' is not defined")]
    Template {
        dataset: String,
        view: String,
        name: String,
    },

    #[error("{source}")]
    BulkDelete {
        /// At least one view was removed before the failure.
        deleted_any: bool,
        #[source]
        source: Box<BqvError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl BqvError {
    /// The classified remote error behind this failure, if there is one.
    pub fn bigquery(&self) -> Option<&BigQueryError> {
        match self {
            BqvError::BigQuery(e) => Some(e),
            BqvError::BulkDelete { source, .. } => source.bigquery(),
            BqvError::Client(source) => source.bigquery(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BqvError>;
