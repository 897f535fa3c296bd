use gcp_bigquery_client::error::{BQError, ResponseError};
use super::bq_error::{BigQueryError, QueryErrorLocation};
use regex::Regex;

pub fn parse_bq_error(error: BQError, context: ErrorContext) -> BigQueryError {
    match &error {
        BQError::ResponseError { error: resp } => parse_response_error(resp, context),

        BQError::RequestError(req_err) => {
            BigQueryError::ConnectionFailed {
                reason: req_err.to_string(),
            }
        }

        BQError::NoToken => {
            BigQueryError::AuthenticationFailed {
                reason: "No authentication token available".to_string(),
                help: "Ensure you are authenticated with GCP".to_string(),
            }
        }

        BQError::AuthError(auth_err) => {
            BigQueryError::AuthenticationFailed {
                reason: format!("{:?}", auth_err),
                help: "Check your authentication configuration".to_string(),
            }
        }

        BQError::YupAuthError(yup_err) => {
            BigQueryError::AuthenticationFailed {
                reason: yup_err.to_string(),
                help: "OAuth authentication failed".to_string(),
            }
        }

        BQError::InvalidServiceAccountKey(io_err) => {
            BigQueryError::InvalidCredentials {
                path: std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
                reason: io_err.to_string(),
            }
        }

        BQError::InvalidApplicationDefaultCredentialsAuthenticator(io_err) => {
            BigQueryError::AuthenticationFailed {
                reason: io_err.to_string(),
                help: "Application default credentials are invalid or not configured".to_string(),
            }
        }

        BQError::SerializationError(serde_err) => {
            BigQueryError::Unknown {
                code: Some("SERIALIZATION".to_string()),
                message: context.annotate(serde_err.to_string()),
                raw_error: error.to_string(),
            }
        }

        BQError::ConnectionPoolError(msg) => {
            BigQueryError::ConnectionFailed {
                reason: msg.clone(),
            }
        }

        BQError::TonicTransportError(tonic_err) => {
            BigQueryError::ConnectionFailed {
                reason: tonic_err.to_string(),
            }
        }

        _ => BigQueryError::Unknown {
            code: None,
            message: context.annotate(error.to_string()),
            raw_error: format!("{:?}", error),
        }
    }
}

fn parse_response_error(
    resp: &ResponseError,
    context: ErrorContext,
) -> BigQueryError {
    let status = resp.error.code;
    let message = &resp.error.message;
    let reason = resp.error.errors.first().and_then(|e| e.get("reason").map(|s| s.as_str()));

    classify_response(i64::from(status), reason, message, &context)
        .unwrap_or_else(|| BigQueryError::Unknown {
            code: reason.map(|s| s.to_string()),
            message: context.annotate(message.as_str()),
            raw_error: format!("{:?}", resp),
        })
}

fn classify_response(
    status: i64,
    reason: Option<&str>,
    message: &str,
    context: &ErrorContext,
) -> Option<BigQueryError> {
    let classified = match (status, reason) {
        (400, Some("invalidQuery")) | (400, Some("invalid")) => {
            BigQueryError::InvalidQuery {
                sql_preview: context.sql.clone().unwrap_or_default(),
                message: message.to_string(),
                location: extract_query_location(message),
            }
        }

        (403, Some("accessDenied")) => {
            BigQueryError::AccessDenied {
                resource: context.resource.clone().unwrap_or_else(|| "resource".to_string()),
                required_permission: extract_required_permission(message),
            }
        }

        (403, Some("quotaExceeded")) | (403, Some("rateLimitExceeded")) => {
            BigQueryError::QuotaExceeded {
                quota_type: extract_quota_type(message).unwrap_or_else(|| "API".to_string()),
                message: message.to_string(),
            }
        }

        (404, _) => parse_not_found_error(message, context),

        (500..=599, _) => BigQueryError::ServerError {
            status,
            message: message.to_string(),
        },

        _ => return None,
    };

    Some(classified)
}

fn parse_not_found_error(message: &str, context: &ErrorContext) -> BigQueryError {
    // "Not found: Table project:dataset.view"
    if let Ok(re) = Regex::new(r"(?i)table\s+([^:\s]+):([^.\s]+)\.([^\s]+)") {
        if let Some(caps) = re.captures(message) {
            return BigQueryError::ViewNotFound {
                project: caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                dataset: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                view: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
            };
        }
    }

    // "Not found: Dataset project:dataset"
    if let Ok(re) = Regex::new(r"(?i)dataset\s+([^:\s]+):([^\s]+)") {
        if let Some(caps) = re.captures(message) {
            return BigQueryError::DatasetNotFound {
                project: caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                dataset: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
            };
        }
    }

    match (&context.project, &context.dataset, &context.view) {
        (Some(project), Some(dataset), Some(view)) => BigQueryError::ViewNotFound {
            project: project.clone(),
            dataset: dataset.clone(),
            view: view.clone(),
        },
        (Some(project), Some(dataset), None) => BigQueryError::DatasetNotFound {
            project: project.clone(),
            dataset: dataset.clone(),
        },
        _ => BigQueryError::Unknown {
            code: Some("notFound".to_string()),
            message: context.annotate(message),
            raw_error: message.to_string(),
        },
    }
}

fn extract_query_location(message: &str) -> Option<QueryErrorLocation> {
    // BigQuery reports positions as "at [line:column]"
    let line_col_re = Regex::new(r"\[(\d+):(\d+)\]").ok()?;
    let caps = line_col_re.captures(message)?;
    Some(QueryErrorLocation {
        line: caps.get(1).and_then(|m| m.as_str().parse().ok()),
        column: caps.get(2).and_then(|m| m.as_str().parse().ok()),
    })
}

fn extract_required_permission(message: &str) -> Option<String> {
    let perm_re = Regex::new(r"(bigquery\.[a-zA-Z.]+[a-zA-Z])").ok()?;
    perm_re.captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_quota_type(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("rate") {
        Some("rate limit".to_string())
    } else if msg_lower.contains("table") && msg_lower.contains("update") {
        Some("table metadata updates".to_string())
    } else {
        None
    }
}

#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    pub sql: Option<String>,
    pub operation: Option<String>,
    pub resource: Option<String>,
    pub project: Option<String>,
    pub dataset: Option<String>,
    pub view: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        let full_sql = sql.into();
        // Keep first 500 chars as preview
        self.sql = Some(match full_sql.char_indices().nth(500) {
            Some((idx, _)) => format!("{}...", &full_sql[..idx]),
            None => full_sql,
        });
        self
    }

    pub fn with_operation(mut self, op: impl Into<String>) -> Self {
        self.operation = Some(op.into());
        self
    }

    /// Prefixes `message` with the failed operation, when one was recorded.
    pub fn annotate(&self, message: impl Into<String>) -> String {
        let message = message.into();
        match &self.operation {
            Some(op) => format!("{} failed: {}", op, message),
            None => message,
        }
    }

    pub fn with_dataset(mut self, project: impl Into<String>, dataset: impl Into<String>) -> Self {
        let project = project.into();
        let dataset = dataset.into();
        self.resource = Some(format!("{}.{}", project, dataset));
        self.project = Some(project);
        self.dataset = Some(dataset);
        self
    }

    pub fn with_view(mut self, project: impl Into<String>, dataset: impl Into<String>, view: impl Into<String>) -> Self {
        let project = project.into();
        let dataset = dataset.into();
        let view = view.into();
        self.resource = Some(format!("{}.{}.{}", project, dataset, view));
        self.project = Some(project);
        self.dataset = Some(dataset);
        self.view = Some(view);
        self
    }
}
