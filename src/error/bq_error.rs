use std::fmt;

#[derive(Debug, Clone)]
pub enum BigQueryError {
    AuthenticationFailed {
        reason: String,
        help: String,
    },

    InvalidQuery {
        sql_preview: String,
        message: String,
        location: Option<QueryErrorLocation>,
    },

    ViewNotFound {
        project: String,
        dataset: String,
        view: String,
    },

    DatasetNotFound {
        project: String,
        dataset: String,
    },

    AccessDenied {
        resource: String,
        required_permission: Option<String>,
    },

    QuotaExceeded {
        quota_type: String,
        message: String,
    },

    ServerError {
        status: i64,
        message: String,
    },

    ConnectionFailed {
        reason: String,
    },

    InvalidCredentials {
        path: Option<String>,
        reason: String,
    },

    Unknown {
        code: Option<String>,
        message: String,
        raw_error: String,
    },
}

#[derive(Debug, Clone)]
pub struct QueryErrorLocation {
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl BigQueryError {
    /// True when the target view (or its whole dataset) does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BigQueryError::ViewNotFound { .. } | BigQueryError::DatasetNotFound { .. }
        )
    }

    pub fn suggestion(&self) -> String {
        match self {
            BigQueryError::AuthenticationFailed { .. } => {
                "Try:\n  \
                 • Run: gcloud auth application-default login\n  \
                 • Or set GOOGLE_APPLICATION_CREDENTIALS to your service account key file".to_string()
            }

            BigQueryError::InvalidQuery { .. } => {
                "Check the view SQL for:\n  \
                 • Syntax errors (typos, missing keywords)\n  \
                 • Tables referenced by the view that do not exist\n  \
                 • Unrendered or wrongly rendered {{ params }}\n  \
                 • Run: bqv plan to inspect the rendered SQL".to_string()
            }

            BigQueryError::ViewNotFound { project, dataset, view } => {
                format!(
                    "Verify the view exists:\n  \
                     • Run: bq show {project}:{dataset}.{view}\n  \
                     • Check the directory name of the view definition"
                )
            }

            BigQueryError::DatasetNotFound { project, dataset } => {
                format!(
                    "Views are created inside existing datasets:\n  \
                     • Run: bq mk --dataset {project}:{dataset}\n  \
                     • Check the dataset directory name for typos"
                )
            }

            BigQueryError::AccessDenied { resource, required_permission } => {
                let perm = required_permission.as_deref().unwrap_or("bigquery.tables.create");
                format!(
                    "Request access to {resource}:\n  \
                     • Required permission: {perm}\n  \
                     • Contact your project admin\n  \
                     • Or run: gcloud projects add-iam-policy-binding PROJECT_ID \\\n    \
                       --member=user:YOUR_EMAIL --role=roles/bigquery.dataEditor"
                )
            }

            BigQueryError::QuotaExceeded { quota_type, .. } => {
                format!(
                    "Quota '{quota_type}' exceeded:\n  \
                     • Wait and re-run the command\n  \
                     • Request quota increase in Cloud Console"
                )
            }

            BigQueryError::ServerError { .. } => {
                "BigQuery returned a server error:\n  \
                 • Re-run the command, apply and destroy are idempotent\n  \
                 • Check BigQuery status: https://status.cloud.google.com/".to_string()
            }

            BigQueryError::ConnectionFailed { .. } => {
                "Connection failed:\n  \
                 • Check your internet connection\n  \
                 • Verify BigQuery API is enabled for your project".to_string()
            }

            BigQueryError::InvalidCredentials { path, .. } => {
                let path_info = path.as_ref()
                    .map(|p| format!(" ({})", p))
                    .unwrap_or_default();
                format!(
                    "Invalid credentials{path_info}:\n  \
                     • Check GOOGLE_APPLICATION_CREDENTIALS path\n  \
                     • Verify the service account key is valid\n  \
                     • Run: gcloud auth application-default login"
                )
            }

            BigQueryError::Unknown { .. } => {
                "An unexpected error occurred:\n  \
                 • Check the error message for details\n  \
                 • Re-run with --verbose for more context".to_string()
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BigQueryError::AuthenticationFailed { .. } => "AUTH_FAILED",
            BigQueryError::InvalidQuery { .. } => "INVALID_QUERY",
            BigQueryError::ViewNotFound { .. } => "VIEW_NOT_FOUND",
            BigQueryError::DatasetNotFound { .. } => "DATASET_NOT_FOUND",
            BigQueryError::AccessDenied { .. } => "ACCESS_DENIED",
            BigQueryError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            BigQueryError::ServerError { .. } => "SERVER_ERROR",
            BigQueryError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            BigQueryError::InvalidCredentials { .. } => "INVALID_CREDENTIALS",
            BigQueryError::Unknown { .. } => "UNKNOWN",
        }
    }
}

impl fmt::Display for BigQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BigQueryError::AuthenticationFailed { reason, .. } => {
                write!(f, "Authentication failed: {reason}")
            }

            BigQueryError::InvalidQuery { message, sql_preview, location } => {
                write!(f, "Invalid view SQL: {message}")?;
                if let Some(loc) = location {
                    if let Some(line) = loc.line {
                        write!(f, " (line {line}")?;
                        if let Some(col) = loc.column {
                            write!(f, ", column {col}")?;
                        }
                        write!(f, ")")?;
                    }
                }
                if !sql_preview.is_empty() {
                    write!(f, "\n\nSQL preview:\n  {sql_preview}")?;
                }
                Ok(())
            }

            BigQueryError::ViewNotFound { project, dataset, view } => {
                write!(f, "View not found: {project}.{dataset}.{view}")
            }

            BigQueryError::DatasetNotFound { project, dataset } => {
                write!(f, "Dataset not found: {project}.{dataset}")
            }

            BigQueryError::AccessDenied { resource, required_permission } => {
                write!(f, "Access denied to {resource}")?;
                if let Some(perm) = required_permission {
                    write!(f, " (requires {perm})")?;
                }
                Ok(())
            }

            BigQueryError::QuotaExceeded { quota_type, message } => {
                write!(f, "Quota exceeded ({quota_type}): {message}")
            }

            BigQueryError::ServerError { status, message } => {
                write!(f, "Server error [HTTP {status}]: {message}")
            }

            BigQueryError::ConnectionFailed { reason } => {
                write!(f, "Connection failed: {reason}")
            }

            BigQueryError::InvalidCredentials { reason, path } => {
                write!(f, "Invalid credentials: {reason}")?;
                if let Some(p) = path {
                    write!(f, " (path: {p})")?;
                }
                Ok(())
            }

            BigQueryError::Unknown { code, message, .. } => {
                if let Some(c) = code {
                    write!(f, "BigQuery error [{c}]: {message}")
                } else {
                    write!(f, "BigQuery error: {message}")
                }
            }
        }
    }
}

impl std::error::Error for BigQueryError {}
