use async_trait::async_trait;
use gcp_bigquery_client::Client;
use gcp_bigquery_client::dataset::ListOptions as DatasetListOptions;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::table::ListOptions as TableListOptions;
use tracing::debug;
use crate::dsl::ViewMeta;
use crate::error::{BqvError, Result, parse_bq_error, ErrorContext};
use super::remote::ViewClient;

const VIEW_TABLE_TYPE: &str = "VIEW";

#[derive(Clone)]
pub struct BqClient {
    client: Client,
    project_id: String,
}

impl BqClient {
    pub async fn new(project_id: impl Into<String>) -> Result<Self> {
        let project_id = project_id.into();

        let client = Client::from_application_default_credentials()
            .await
            .map_err(|e| {
                let ctx = ErrorContext::new().with_operation("client_init");
                BqvError::BigQuery(parse_bq_error(e, ctx))
            })?;

        Ok(Self {
            client,
            project_id,
        })
    }

    async fn execute_ddl(&self, sql: &str, ctx: ErrorContext) -> Result<()> {
        self.client
            .job()
            .query(&self.project_id, QueryRequest::new(sql))
            .await
            .map_err(|e| BqvError::BigQuery(parse_bq_error(e, ctx.with_sql(sql))))?;

        Ok(())
    }
}

#[async_trait]
impl ViewClient for BqClient {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn create_or_replace_view(
        &self,
        dataset: &str,
        view: &str,
        sql: &str,
        meta: &ViewMeta,
    ) -> Result<()> {
        let ddl = build_view_ddl(&self.project_id, dataset, view, sql, meta);
        debug!("Executing DDL:\n{}", ddl);

        let ctx = ErrorContext::new()
            .with_operation("create_or_replace_view")
            .with_view(&self.project_id, dataset, view);
        self.execute_ddl(&ddl, ctx).await
    }

    async fn delete_view_if_exists(&self, dataset: &str, view: &str) -> Result<bool> {
        match self.client.table().delete(&self.project_id, dataset, view).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let ctx = ErrorContext::new()
                    .with_operation("delete_view")
                    .with_view(&self.project_id, dataset, view);
                let err = parse_bq_error(e, ctx);
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(BqvError::BigQuery(err))
                }
            }
        }
    }

    async fn list_datasets(&self) -> Result<Vec<String>> {
        let mut datasets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let options = match page_token.take() {
                Some(token) => DatasetListOptions::default().page_token(token),
                None => DatasetListOptions::default(),
            };

            let page = self.client
                .dataset()
                .list(&self.project_id, options)
                .await
                .map_err(|e| {
                    let ctx = ErrorContext::new().with_operation("list_datasets");
                    BqvError::BigQuery(parse_bq_error(e, ctx))
                })?;

            datasets.extend(
                page.datasets
                    .into_iter()
                    .map(|d| d.dataset_reference.dataset_id),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(datasets)
    }

    async fn list_views(&self, dataset: &str) -> Result<Vec<String>> {
        let mut views = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let options = match page_token.take() {
                Some(token) => TableListOptions::default().page_token(token),
                None => TableListOptions::default(),
            };

            let page = self.client
                .table()
                .list(&self.project_id, dataset, options)
                .await
                .map_err(|e| {
                    let ctx = ErrorContext::new()
                        .with_operation("list_views")
                        .with_dataset(&self.project_id, dataset);
                    BqvError::BigQuery(parse_bq_error(e, ctx))
                })?;

            views.extend(
                page.tables
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|t| t.r#type.as_deref() == Some(VIEW_TABLE_TYPE))
                    .map(|t| t.table_reference.table_id),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(views)
    }
}

/// `CREATE OR REPLACE VIEW` statement for one view, with its metadata as options.
pub fn build_view_ddl(project: &str, dataset: &str, view: &str, sql: &str, meta: &ViewMeta) -> String {
    let mut options = Vec::new();

    if let Some(description) = &meta.description {
        options.push(format!("description = {}", string_literal(description)));
    }

    if !meta.labels.is_empty() {
        let labels: Vec<String> = meta.labels
            .iter()
            .map(|(k, v)| format!("({}, {})", string_literal(k), string_literal(v)))
            .collect();
        options.push(format!("labels = [{}]", labels.join(", ")));
    }

    let options_clause = if options.is_empty() {
        String::new()
    } else {
        format!("\nOPTIONS ({})", options.join(", "))
    };

    format!(
        "CREATE OR REPLACE VIEW `{project}.{dataset}.{view}`{options_clause}\nAS\n{}",
        sql.trim_end().trim_end_matches(';'),
    )
}

fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_ddl_without_options() {
        let ddl = build_view_ddl("proj", "a", "v1", "SELECT 1", &ViewMeta::default());
        assert_eq!(ddl, "CREATE OR REPLACE VIEW `proj.a.v1`\nAS\nSELECT 1");
    }

    #[test]
    fn test_ddl_strips_trailing_semicolon() {
        let ddl = build_view_ddl("proj", "a", "v1", "SELECT 1;\n", &ViewMeta::default());
        assert!(ddl.ends_with("AS\nSELECT 1"));
    }

    #[test]
    fn test_ddl_with_description_and_labels() {
        let meta = ViewMeta {
            description: Some("Daily \"active\" users".into()),
            labels: BTreeMap::from([
                ("team".to_string(), "growth".to_string()),
                ("env".to_string(), "prod".to_string()),
            ]),
        };
        let ddl = build_view_ddl("proj", "a", "v1", "SELECT 1", &meta);

        assert!(ddl.contains(r#"description = "Daily \"active\" users""#));
        assert!(ddl.contains(r#"labels = [("env", "prod"), ("team", "growth")]"#));
        assert!(ddl.starts_with("CREATE OR REPLACE VIEW `proj.a.v1`\nOPTIONS ("));
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("a\\b\nc"), r#""a\\b\nc""#);
    }
}
