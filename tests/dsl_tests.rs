use bqv::{BqvError, Params, TemplateRenderer, ViewLoader};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    Path::new("tests/fixtures").to_path_buf()
}

#[test]
fn test_load_fixture_views() {
    let configs = ViewLoader::new().load_dir(fixtures().join("views")).unwrap();

    let names: Vec<String> = configs.iter().map(|c| c.qualified_name()).collect();
    assert_eq!(
        names,
        vec![
            "analytics.daily_users",
            "analytics.weekly_users",
            "sales.orders_enriched",
        ]
    );
}

#[test]
fn test_fixture_meta_is_attached() {
    let configs = ViewLoader::new().load_dir(fixtures().join("views")).unwrap();

    let daily = &configs[0];
    assert_eq!(daily.meta.description.as_deref(), Some("Distinct users per day"));
    assert_eq!(daily.meta.labels.get("team").map(String::as_str), Some("growth"));

    let weekly = &configs[1];
    assert!(weekly.meta.description.is_none());
    assert_eq!(weekly.source, PathBuf::from("analytics/weekly_users.sql"));
}

#[test]
fn test_render_fixtures_with_params() {
    let configs = ViewLoader::new().load_dir(fixtures().join("views")).unwrap();
    let params = Params::load(fixtures().join("params.yaml")).unwrap();
    let renderer = TemplateRenderer::new();

    let daily = renderer.render(&configs[0], &params).unwrap();
    assert!(daily.contains("FROM `acme-prod.raw.events`"));
    assert!(!daily.contains("{{"));

    let orders = renderer.render(&configs[2], &params).unwrap();
    assert!(orders.contains("JOIN `acme-prod.raw.customers` c"));
    assert!(orders.contains("o.environment = 'prod'"));
}

#[test]
fn test_render_reports_missing_param() {
    let configs = ViewLoader::new().load_dir(fixtures().join("views")).unwrap();
    let params = Params::load(fixtures().join("params_partial.yaml")).unwrap();
    let renderer = TemplateRenderer::new();

    assert!(renderer.render(&configs[0], &params).is_ok());

    match renderer.render(&configs[2], &params) {
        Err(BqvError::Template { dataset, view, name }) => {
            assert_eq!(dataset, "sales");
            assert_eq!(view, "orders_enriched");
            assert_eq!(name, "env");
        }
        other => panic!("expected a template error, got {:?}", other),
    }
}

#[test]
fn test_load_missing_dir_fails() {
    let temp = TempDir::new().unwrap();
    let result = ViewLoader::new().load_dir(temp.path().join("nope"));

    assert!(matches!(result, Err(BqvError::ConfigRead(_))));
}

#[test]
fn test_load_empty_dir() {
    let temp = TempDir::new().unwrap();
    let configs = ViewLoader::new().load_dir(temp.path()).unwrap();

    assert!(configs.is_empty());
}

#[test]
fn test_load_rejects_misplaced_sql() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("orphan.sql"), "SELECT 1").unwrap();

    let result = ViewLoader::new().load_dir(temp.path());

    assert!(matches!(result, Err(BqvError::ConfigRead(_))));
}

#[test]
fn test_load_ignores_non_sql_files() {
    let temp = TempDir::new().unwrap();
    let view_dir = temp.path().join("ds").join("v");
    fs::create_dir_all(&view_dir).unwrap();
    fs::write(view_dir.join("query.sql"), "SELECT 1").unwrap();
    fs::write(view_dir.join("README.md"), "notes").unwrap();

    let configs = ViewLoader::new().load_dir(temp.path()).unwrap();

    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].qualified_name(), "ds.v");
    assert_eq!(configs[0].sql, "SELECT 1");
}

#[test]
fn test_params_json_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("params.json");
    fs::write(&path, r#"{"project": "acme-dev", "limit": 10}"#).unwrap();

    let params = Params::load(&path).unwrap();

    assert_eq!(params.get("project"), Some("acme-dev"));
    assert_eq!(params.get("limit"), Some("10"));
}
