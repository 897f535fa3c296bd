use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::error::{BqvError, Result};

/// File name of a view definition in the directory layout.
pub const QUERY_FILE: &str = "query.sql";
/// Optional metadata file next to `query.sql`.
pub const META_FILE: &str = "meta.yaml";

static DATASET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,1024}$").unwrap());

static VIEW_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_ -]{0,1023}$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewMeta {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewConfig {
    pub dataset: String,
    pub view: String,
    pub sql: String,
    pub source: PathBuf,
    #[serde(flatten)]
    pub meta: ViewMeta,
}

impl ViewConfig {
    pub fn new(dataset: impl Into<String>, view: impl Into<String>, sql: impl Into<String>) -> Self {
        let dataset = dataset.into();
        let view = view.into();
        let source = PathBuf::from(&dataset).join(&view).join(QUERY_FILE);
        Self {
            dataset,
            view,
            sql: sql.into(),
            source,
            meta: ViewMeta::default(),
        }
    }

    /// Maps a definition file, given relative to the views directory, onto a view.
    ///
    /// Accepted layouts are `<dataset>/<view>/query.sql` and `<dataset>/<view>.sql`.
    pub fn from_entry(relative_path: &Path, sql: impl Into<String>, meta: Option<ViewMeta>) -> Result<Self> {
        let parts = path_parts(relative_path)?;

        let (dataset, view) = match parts.as_slice() {
            [dataset, view, file] if file.as_str() == QUERY_FILE => (dataset.clone(), view.clone()),
            [dataset, file] => {
                let view = file.strip_suffix(".sql").ok_or_else(|| malformed(relative_path, "expected a .sql file"))?;
                (dataset.clone(), view.to_string())
            }
            _ => {
                return Err(malformed(
                    relative_path,
                    "expected <dataset>/<view>/query.sql or <dataset>/<view>.sql",
                ))
            }
        };

        if !DATASET_NAME.is_match(&dataset) {
            return Err(malformed(relative_path, &format!("invalid dataset name '{}'", dataset)));
        }
        if !VIEW_NAME.is_match(&view) {
            return Err(malformed(relative_path, &format!("invalid view name '{}'", view)));
        }

        Ok(Self {
            dataset,
            view,
            sql: sql.into(),
            source: relative_path.to_path_buf(),
            meta: meta.unwrap_or_default(),
        })
    }

    /// `dataset.view`, used in log lines and reports.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.dataset, self.view)
    }
}

impl ViewMeta {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| malformed(path, &e.to_string()))
    }
}

fn path_parts(path: &Path) -> Result<Vec<String>> {
    path.components()
        .map(|c| match c {
            Component::Normal(part) => part
                .to_str()
                .map(|s| s.to_string())
                .ok_or_else(|| malformed(path, "path is not valid UTF-8")),
            _ => Err(malformed(path, "path must be relative to the views directory")),
        })
        .collect()
}

fn malformed(path: &Path, reason: &str) -> BqvError {
    BqvError::ConfigRead(format!("{}: {}", path.display(), reason))
}
