//! Batch configuration
//!
//! Read from `daoweave.toml`. Every field has a default, so an empty file
//! (or no file at all) is a valid configuration.

use std::path::{Path, PathBuf};

use daoweave_artifact::FormattingOverride;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{WeaveError, WeaveResult};

/// Name of the schema every entity belongs to unless `@Entity(schema)` says otherwise
pub const DEFAULT_SCHEMA: &str = "default";

/// Conventional configuration file name
pub const CONFIG_FILE: &str = "daoweave.toml";

/// Per-schema options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaOptions {
    /// Schema version
    pub version: u32,
    /// Package of the schema's DAO classes
    pub dao_package: Option<String>,
}

/// Batch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeaveConfig {
    /// Roots scanned recursively for `*.java`
    pub source_dirs: Vec<PathBuf>,
    /// Package of `DaoSession` and the DAO classes of the default schema
    pub dao_package: Option<String>,
    /// Fixed formatting, replacing detection where defined
    pub formatting: Option<FormattingOverride>,
    /// Declared schemas
    pub schemas: IndexMap<String, SchemaOptions>,
    /// Stop after the first failed file
    pub fail_fast: bool,
    /// Never write files
    pub dry_run: bool,
    /// Generate constructors unless an entity opts out
    pub generate_constructors: bool,
    /// Generate getters and setters unless an entity opts out
    pub generate_getters_setters: bool,
}

impl WeaveConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// [`WeaveError::Config`] if the text is not a valid configuration
    pub fn from_toml(text: &str) -> WeaveResult<Self> {
        toml::from_str(text).map_err(|e| WeaveError::Config(e.to_string()))
    }

    /// Load a configuration file
    ///
    /// Relative `source_dirs` are resolved against the file's directory.
    ///
    /// # Errors
    /// - [`WeaveError::Io`] if the file cannot be read
    /// - [`WeaveError::Config`] if it is not a valid configuration
    pub fn load(path: &Path) -> WeaveResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| WeaveError::io(path, e))?;
        let mut config = Self::from_toml(&text)
            .map_err(|e| WeaveError::Config(format!("{}: {e}", path.display())))?;
        if let Some(base) = path.parent() {
            for dir in &mut config.source_dirs {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
        tracing::debug!(path = %path.display(), dirs = config.source_dirs.len(), "loaded configuration");
        Ok(config)
    }

    /// With source roots
    #[inline]
    #[must_use]
    pub fn with_source_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.source_dirs = dirs.into_iter().collect();
        self
    }

    /// With DAO package of the default schema
    #[inline]
    #[must_use]
    pub fn with_dao_package(mut self, package: impl Into<String>) -> Self {
        self.dao_package = Some(package.into());
        self
    }

    /// With formatting override
    #[inline]
    #[must_use]
    pub fn with_formatting(mut self, formatting: FormattingOverride) -> Self {
        self.formatting = Some(formatting);
        self
    }

    /// With an additional schema
    #[inline]
    #[must_use]
    pub fn with_schema(mut self, name: impl Into<String>, options: SchemaOptions) -> Self {
        self.schemas.insert(name.into(), options);
        self
    }

    /// With fail-fast
    #[inline]
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// With dry-run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether `name` is a known schema
    #[must_use]
    pub fn has_schema(&self, name: &str) -> bool {
        name == DEFAULT_SCHEMA || self.schemas.contains_key(name)
    }

    /// DAO package for a schema, if configured
    #[must_use]
    pub fn dao_package_for(&self, schema: &str) -> Option<&str> {
        self.schemas
            .get(schema)
            .and_then(|s| s.dao_package.as_deref())
            .or(self.dao_package.as_deref())
    }
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            source_dirs: Vec::new(),
            dao_package: None,
            formatting: None,
            schemas: IndexMap::new(),
            fail_fast: false,
            dry_run: false,
            generate_constructors: true,
            generate_getters_setters: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daoweave_artifact::Tabulation;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = WeaveConfig::from_toml("").unwrap();
        assert_eq!(config, WeaveConfig::default());
        assert!(config.generate_constructors);
        assert!(config.has_schema(DEFAULT_SCHEMA));
    }

    #[test]
    fn parses_full_file() {
        let text = r#"
source_dirs = ["src/main/java"]
dao_package = "org.example.dao"
fail_fast = true

[formatting]
line_width = 100
tabulation = { ch = "space", size = 2 }

[schemas.archive]
version = 3
dao_package = "org.example.archive"
"#;
        let config = WeaveConfig::from_toml(text).unwrap();
        assert_eq!(config.source_dirs, [PathBuf::from("src/main/java")]);
        assert!(config.fail_fast);
        let formatting = config.formatting.unwrap();
        assert_eq!(formatting.tabulation, Some(Tabulation::spaces(2)));
        assert_eq!(formatting.line_width, Some(100));
        assert_eq!(config.schemas["archive"].version, 3);
        assert_eq!(config.dao_package_for("archive"), Some("org.example.archive"));
        assert_eq!(config.dao_package_for(DEFAULT_SCHEMA), Some("org.example.dao"));
        assert!(!config.has_schema("other"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = WeaveConfig::from_toml("encoding = \"latin1\"").unwrap_err();
        assert!(matches!(err, WeaveError::Config(_)));
    }

    #[test]
    fn load_resolves_relative_roots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "source_dirs = [\"java\"]\n").unwrap();
        let config = WeaveConfig::load(&path).unwrap();
        assert_eq!(config.source_dirs, [dir.path().join("java")]);
    }

    #[test]
    fn builders_compose() {
        let config = WeaveConfig::new()
            .with_dry_run(true)
            .with_schema("archive", SchemaOptions::default())
            .with_dao_package("org.example.dao");
        assert!(config.dry_run);
        assert!(config.has_schema("archive"));
        assert_eq!(config.dao_package_for("archive"), Some("org.example.dao"));
    }
}
