//! Checksum-validated SQL file loading

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use ring::digest::{SHA256, digest};
use sqlspec_core::{
    CacheRegistry, CachedSqlFile, Result, Sql, SqlSpecError, StatementConfig, fingerprint,
    global_caches,
};

use crate::parse::parse_sql_file;

/// Loads aiosql-style SQL files into named [`Sql`] statements, caching
/// parsed files against a SHA-256 content checksum.
pub struct SqlFileLoader {
    caches: Arc<CacheRegistry>,
    config: StatementConfig,
}

impl SqlFileLoader {
    pub fn new() -> Self {
        Self {
            caches: global_caches(),
            config: StatementConfig::default(),
        }
    }

    pub fn with_caches(mut self, caches: Arc<CacheRegistry>) -> Self {
        self.caches = caches;
        self
    }

    /// Configuration attached to statements handed out by this loader.
    pub fn with_config(mut self, config: StatementConfig) -> Self {
        self.config = config;
        self
    }

    /// Load one file's named statements.
    ///
    /// Every lookup re-reads and re-hashes the file; a checksum match
    /// reuses the parsed entry, a mismatch re-parses and replaces it.
    #[tracing::instrument(skip(self))]
    pub fn load_path(&self, path: &Path) -> Result<Arc<CachedSqlFile>> {
        let content = std::fs::read_to_string(path)?;
        let checksum = hex::encode(digest(&SHA256, content.as_bytes()));
        let key = fingerprint::hash_str(&path.to_string_lossy());

        if let Some(cached) = self.caches.file().get(key) {
            if cached.checksum == checksum {
                return Ok(cached);
            }
            tracing::debug!(path = %path.display(), "file checksum changed, reloading");
        }

        let statements = parse_sql_file(&content)?;
        tracing::debug!(
            path = %path.display(),
            statements = statements.len(),
            "loaded SQL file"
        );
        let entry = Arc::new(CachedSqlFile {
            path: path.to_path_buf(),
            checksum,
            statements,
        });
        self.caches.file().insert(key, entry.clone());
        Ok(entry)
    }

    /// Load every `.sql` file under `root`.
    ///
    /// Subdirectories become dot-separated namespaces ("queries/users/"
    /// contributes to the "queries.users" namespace); files directly in
    /// `root` land in the empty namespace. Duplicate statement names
    /// within one namespace are rejected.
    pub fn load_directory(
        &self,
        root: &Path,
    ) -> Result<IndexMap<String, IndexMap<String, String>>> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in ignore::WalkBuilder::new(root).standard_filters(false).build() {
            let entry = entry.map_err(|e| SqlSpecError::Io(std::io::Error::other(e)))?;
            let path = entry.path();
            if entry.file_type().is_some_and(|t| t.is_file())
                && path.extension().is_some_and(|ext| ext == "sql")
            {
                paths.push(path.to_path_buf());
            }
        }
        paths.sort();

        let mut namespaces: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
        for path in paths {
            let file = self.load_path(&path)?;
            let namespace = namespace_for(root, &path);
            let bucket = namespaces.entry(namespace).or_default();
            for (name, sql) in &file.statements {
                if bucket.contains_key(name) {
                    return Err(SqlSpecError::DuplicateStatement { name: name.clone() });
                }
                bucket.insert(name.clone(), sql.clone());
            }
        }
        Ok(namespaces)
    }

    /// A named statement from a file, as a ready [`Sql`] carrying this
    /// loader's configuration.
    pub fn get_statement(&self, path: &Path, name: &str) -> Result<Sql> {
        let file = self.load_path(path)?;
        let text = file
            .statements
            .get(name)
            .ok_or_else(|| SqlSpecError::Configuration(format!(
                "no statement named '{}' in {}",
                name,
                path.display()
            )))?;
        Ok(Sql::with_config(text.clone(), self.config.clone()))
    }
}

impl Default for SqlFileLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn namespace_for(root: &Path, path: &Path) -> String {
    path.parent()
        .and_then(|dir| dir.strip_prefix(root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(".")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlspec_core::CacheConfig;
    use std::fs;

    fn loader() -> SqlFileLoader {
        SqlFileLoader::new().with_caches(Arc::new(CacheRegistry::new(CacheConfig::default())))
    }

    #[test]
    fn test_load_path_parses_statements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.sql");
        fs::write(&path, "-- name: get_user\nSELECT * FROM u WHERE id = :id;\n").unwrap();

        let file = loader().load_path(&path).unwrap();
        assert_eq!(
            file.statements.get("get_user").unwrap(),
            "SELECT * FROM u WHERE id = :id"
        );
    }

    #[test]
    fn test_headerless_file_yields_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.sql");
        fs::write(&path, "SELECT 1;\n").unwrap();

        let file = loader().load_path(&path).unwrap();
        assert!(file.statements.is_empty());
    }

    #[test]
    fn test_checksum_hit_reuses_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.sql");
        fs::write(&path, "-- name: a\nSELECT 1;\n").unwrap();

        let loader = loader();
        let first = loader.load_path(&path).unwrap();
        let second = loader.load_path(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_checksum_mismatch_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.sql");
        fs::write(&path, "-- name: a\nSELECT 1;\n").unwrap();

        let loader = loader();
        let first = loader.load_path(&path).unwrap();
        fs::write(&path, "-- name: a\nSELECT 2;\n").unwrap();
        let second = loader.load_path(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.statements.get("a").unwrap(), "SELECT 2");
    }

    #[test]
    fn test_load_directory_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("users")).unwrap();
        fs::write(
            dir.path().join("root.sql"),
            "-- name: ping\nSELECT 1;\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("users").join("queries.sql"),
            "-- name: by_id\nSELECT * FROM u WHERE id = ?;\n",
        )
        .unwrap();

        let namespaces = loader().load_directory(dir.path()).unwrap();
        assert!(namespaces.get("").unwrap().contains_key("ping"));
        assert!(namespaces.get("users").unwrap().contains_key("by_id"));
    }

    #[test]
    fn test_duplicate_across_files_in_namespace() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.sql"), "-- name: q\nSELECT 1;\n").unwrap();
        fs::write(dir.path().join("b.sql"), "-- name: q\nSELECT 2;\n").unwrap();

        let err = loader().load_directory(dir.path()).unwrap_err();
        assert!(matches!(err, SqlSpecError::DuplicateStatement { .. }));
    }

    #[test]
    fn test_get_statement_builds_sql() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.sql");
        fs::write(&path, "-- name: by_id\nSELECT * FROM u WHERE id = ?;\n").unwrap();

        let sql = loader().get_statement(&path, "by_id").unwrap();
        assert_eq!(sql.text(), "SELECT * FROM u WHERE id = ?");
        assert!(sql.returns_rows());
    }

    #[test]
    fn test_get_statement_unknown_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.sql");
        fs::write(&path, "-- name: a\nSELECT 1;\n").unwrap();

        assert!(matches!(
            loader().get_statement(&path, "missing"),
            Err(SqlSpecError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = loader()
            .load_path(Path::new("/nonexistent/never.sql"))
            .unwrap_err();
        assert!(matches!(err, SqlSpecError::Io(_)));
    }
}
