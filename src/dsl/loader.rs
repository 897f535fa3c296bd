use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use glob::{glob, Pattern};
use tracing::{debug, warn};
use crate::error::{BqvError, Result};
use super::parser::{ViewConfig, ViewMeta, META_FILE, QUERY_FILE};

pub struct ViewLoader;

impl ViewLoader {
    pub fn new() -> Self {
        Self
    }

    /// Loads every view definition under `path`, sorted by dataset then view.
    pub fn load_dir(&self, path: impl AsRef<Path>) -> Result<Vec<ViewConfig>> {
        let given = path.as_ref();

        // glob drops `./` from its matches, so walk and strip the canonical path
        let base = fs::canonicalize(given)
            .map_err(|e| BqvError::ConfigRead(format!("{}: {}", given.display(), e)))?;
        let base = base.as_path();

        fs::read_dir(base)
            .map_err(|e| BqvError::ConfigRead(format!("{}: {}", given.display(), e)))?;

        let pattern = format!("{}/**/*.sql", Pattern::escape(&base.to_string_lossy()));

        let sql_files: Vec<PathBuf> = glob(&pattern)
            .map_err(|e| BqvError::ConfigRead(e.to_string()))?
            .map(|r| r.map_err(|e| BqvError::ConfigRead(e.to_string())))
            .collect::<Result<_>>()?;

        let mut configs = sql_files
            .iter()
            .map(|sql_path| self.load_view(base, sql_path))
            .collect::<Result<Vec<_>>>()?;

        configs.sort_by(|a, b| (&a.dataset, &a.view).cmp(&(&b.dataset, &b.view)));
        warn_duplicates(&configs);

        debug!("Loaded {} views from {}", configs.len(), given.display());
        Ok(configs)
    }

    pub fn load_view(&self, base: &Path, sql_path: &Path) -> Result<ViewConfig> {
        let relative = sql_path.strip_prefix(base)
            .map_err(|_| BqvError::ConfigRead(format!(
                "{} is outside of {}", sql_path.display(), base.display()
            )))?;

        let sql = fs::read_to_string(sql_path)
            .map_err(|e| BqvError::ConfigRead(format!("{}: {}", sql_path.display(), e)))?;

        let meta = if sql_path.file_name().is_some_and(|name| name == QUERY_FILE) {
            self.load_meta(sql_path.with_file_name(META_FILE))?
        } else {
            None
        };

        ViewConfig::from_entry(relative, sql, meta)
    }

    fn load_meta(&self, meta_path: PathBuf) -> Result<Option<ViewMeta>> {
        if !meta_path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&meta_path)
            .map_err(|e| BqvError::ConfigRead(format!("{}: {}", meta_path.display(), e)))?;
        ViewMeta::parse(&content, &meta_path).map(Some)
    }
}

impl Default for ViewLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn warn_duplicates(configs: &[ViewConfig]) {
    let mut seen = HashSet::new();
    for config in configs {
        if !seen.insert((config.dataset.as_str(), config.view.as_str())) {
            warn!(
                "View {} is defined more than once ({}); the last definition applied wins",
                config.qualified_name(),
                config.source.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    static CWD_LOCK: Mutex<()> = Mutex::new(());

    fn load_from_cwd(cwd: &Path, dir: &str) -> Result<Vec<ViewConfig>> {
        let _guard = CWD_LOCK.lock().unwrap();
        let previous = env::current_dir().unwrap();
        env::set_current_dir(cwd).unwrap();
        let result = ViewLoader::new().load_dir(dir);
        env::set_current_dir(previous).unwrap();
        result
    }

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_sorted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b/v1/query.sql", "SELECT 1");
        write(dir.path(), "a/v2.sql", "SELECT 2");
        write(dir.path(), "a/v1/query.sql", "SELECT 3");

        let configs = ViewLoader::new().load_dir(dir.path()).unwrap();
        let names: Vec<String> = configs.iter().map(|c| c.qualified_name()).collect();
        assert_eq!(names, vec!["a.v1", "a.v2", "b.v1"]);
    }

    #[test]
    fn test_meta_loaded_for_directory_layout() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/v1/query.sql", "SELECT 1");
        write(dir.path(), "a/v1/meta.yaml", "description: first view\n");

        let configs = ViewLoader::new().load_dir(dir.path()).unwrap();
        assert_eq!(configs[0].meta.description, Some("first view".to_string()));
    }

    #[test]
    fn test_non_sql_files_ignored() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/v1/query.sql", "SELECT 1");
        write(dir.path(), "README.md", "# views");

        assert_eq!(ViewLoader::new().load_dir(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(ViewLoader::new().load_dir(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = ViewLoader::new().load_dir(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, BqvError::ConfigRead(_)));
    }

    #[test]
    fn test_malformed_layout_fails_whole_load() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/v1/query.sql", "SELECT 1");
        write(dir.path(), "stray.sql", "SELECT 2");

        let err = ViewLoader::new().load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("stray.sql"));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/v1/query.sql", "SELECT 1");
        write(dir.path(), "a/v1.sql", "SELECT 2");

        let configs = ViewLoader::new().load_dir(dir.path()).unwrap();
        assert_eq!(configs.len(), 2);
        assert!(configs.iter().all(|c| c.qualified_name() == "a.v1"));
    }

    #[test]
    fn test_load_current_dir() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/v1/query.sql", "SELECT 1");

        let configs = load_from_cwd(dir.path(), ".").unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].qualified_name(), "a.v1");
        assert_eq!(configs[0].source, PathBuf::from("a/v1/query.sql"));
    }

    #[test]
    fn test_load_dot_relative_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sub/views/b/v2/query.sql", "SELECT 2");
        write(dir.path(), "sub/views/b/v3.sql", "SELECT 3");

        for relative in ["./sub/views", "sub/views", "./sub/../sub/views"] {
            let configs = load_from_cwd(dir.path(), relative).unwrap();
            let names: Vec<String> = configs.iter().map(|c| c.qualified_name()).collect();
            assert_eq!(names, vec!["b.v2", "b.v3"], "loading {}", relative);
        }
    }
}
