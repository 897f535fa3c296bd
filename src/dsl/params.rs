use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use serde_yaml::Value;
use crate::error::{BqvError, Result};

/// Template substitutions shared by every view in one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a YAML (or JSON) mapping of parameter names to scalar values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| BqvError::ParamLoad(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
            .map_err(|e| match e {
                BqvError::ParamLoad(msg) => BqvError::ParamLoad(format!("{}: {}", path.display(), msg)),
                other => other,
            })
    }

    /// Like [`Params::load`], but no file means no parameters.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::new()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let doc: Value = serde_yaml::from_str(content)
            .map_err(|e| BqvError::ParamLoad(e.to_string()))?;

        let mapping = match doc {
            Value::Null => return Ok(Self::new()),
            Value::Mapping(m) => m,
            _ => return Err(BqvError::ParamLoad("expected a mapping of parameter names to values".into())),
        };

        let mut values = BTreeMap::new();
        for (key, value) in mapping {
            let key = scalar_to_string(&key)
                .ok_or_else(|| BqvError::ParamLoad(format!("parameter names must be scalars, got {:?}", key)))?;
            let value = scalar_to_string(&value)
                .ok_or_else(|| BqvError::ParamLoad(format!("parameter '{}' must be a scalar value", key)))?;
            values.insert(key, value);
        }

        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_scalars() {
        let params = Params::parse("project: analytics-prod\nlookback_days: 30\nstrict: true\n").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("project"), Some("analytics-prod"));
        assert_eq!(params.get("lookback_days"), Some("30"));
        assert_eq!(params.get("strict"), Some("true"));
    }

    #[test]
    fn test_parse_json_document() {
        let params = Params::parse(r#"{"x": "1", "env": "dev"}"#).unwrap();
        assert_eq!(params.get("x"), Some("1"));
        assert_eq!(params.get("env"), Some("dev"));
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(Params::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_list() {
        let err = Params::parse("- a\n- b\n").unwrap_err();
        assert!(matches!(err, BqvError::ParamLoad(_)));
    }

    #[test]
    fn test_parse_rejects_nested_value() {
        let err = Params::parse("nested:\n  a: 1\n").unwrap_err();
        assert!(err.to_string().contains("parameter 'nested' must be a scalar value"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Params::load("/definitely/not/here/params.yaml").unwrap_err();
        assert!(matches!(err, BqvError::ParamLoad(ref msg) if msg.contains("params.yaml")));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params.yaml");
        fs::write(&path, "dataset_suffix: _staging\n").unwrap();

        let params = Params::load(&path).unwrap();
        assert_eq!(params.get("dataset_suffix"), Some("_staging"));
    }

    #[test]
    fn test_load_optional_none() {
        assert!(Params::load_optional(None).unwrap().is_empty());
    }

    #[test]
    fn test_from_iter() {
        let params: Params = [("x", "1")].into_iter().collect();
        assert_eq!(params.get("x"), Some("1"));
    }
}
