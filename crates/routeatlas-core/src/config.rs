use crate::error::{AtlasError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "environment",
            ConfigSource::Cli => "cli",
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for RouteAtlas
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    /// CRS all stored features are normalized to
    pub workspace_crs: ConfigValue<u32>,
    /// CRS assumed for sources that do not declare one
    pub ingest_crs: ConfigValue<u32>,
    /// PostgreSQL connection string for the PostGIS backend
    pub database_url: ConfigValue<Option<String>>,
    /// Directory processed outputs are written to
    pub output_dir: ConfigValue<PathBuf>,
    /// Directory the tile cache persists to
    pub tile_cache_dir: ConfigValue<PathBuf>,
    /// Features per insert batch when pushing to a store
    pub batch_size: ConfigValue<usize>,
    /// Maximum features fetched for map rendering
    pub render_limit: ConfigValue<usize>,
    /// Property used to color rendered features
    pub category_property: ConfigValue<String>,
}

impl AtlasConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            workspace_crs: ConfigValue::new(4326, ConfigSource::Default),
            ingest_crs: ConfigValue::new(27700, ConfigSource::Default),
            database_url: ConfigValue::new(None, ConfigSource::Default),
            output_dir: ConfigValue::new(PathBuf::from("output"), ConfigSource::Default),
            tile_cache_dir: ConfigValue::new(
                PathBuf::from(".routeatlas/tiles"),
                ConfigSource::Default,
            ),
            batch_size: ConfigValue::new(1024, ConfigSource::Default),
            render_limit: ConfigValue::new(1000, ConfigSource::Default),
            category_property: ConfigValue::new("route_type".to_string(), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| AtlasError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {}", e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| AtlasError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        // Update values from file
        if let Some(workspace_crs) = file_config.workspace_crs {
            self.workspace_crs.update(workspace_crs, ConfigSource::File);
        }

        if let Some(ingest_crs) = file_config.ingest_crs {
            self.ingest_crs.update(ingest_crs, ConfigSource::File);
        }

        if let Some(database_url) = file_config.database_url {
            self.database_url.update(Some(database_url), ConfigSource::File);
        }

        if let Some(output_dir) = file_config.output_dir {
            self.output_dir.update(output_dir, ConfigSource::File);
        }

        if let Some(tile_cache_dir) = file_config.tile_cache_dir {
            self.tile_cache_dir.update(tile_cache_dir, ConfigSource::File);
        }

        if let Some(batch_size) = file_config.batch_size {
            self.batch_size.update(batch_size, ConfigSource::File);
        }

        if let Some(render_limit) = file_config.render_limit {
            self.render_limit.update(render_limit, ConfigSource::File);
        }

        if let Some(category_property) = file_config.category_property {
            self.category_property.update(category_property, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // ROUTEATLAS_WORKSPACE_CRS
        if let Ok(crs_str) = env::var("ROUTEATLAS_WORKSPACE_CRS") {
            match crs_str.parse::<u32>() {
                Ok(crs) => self.workspace_crs.update(crs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid ROUTEATLAS_WORKSPACE_CRS value '{}': expected integer EPSG code",
                    crs_str
                ),
            }
        }

        // ROUTEATLAS_INGEST_CRS
        if let Ok(crs_str) = env::var("ROUTEATLAS_INGEST_CRS") {
            match crs_str.parse::<u32>() {
                Ok(crs) => self.ingest_crs.update(crs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid ROUTEATLAS_INGEST_CRS value '{}': expected integer EPSG code",
                    crs_str
                ),
            }
        }

        // DATABASE_URL
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database_url.update(Some(url), ConfigSource::Environment);
        }

        // ROUTEATLAS_OUTPUT_DIR
        if let Ok(dir) = env::var("ROUTEATLAS_OUTPUT_DIR") {
            self.output_dir.update(PathBuf::from(dir), ConfigSource::Environment);
        }

        // ROUTEATLAS_TILE_CACHE_DIR
        if let Ok(dir) = env::var("ROUTEATLAS_TILE_CACHE_DIR") {
            self.tile_cache_dir.update(PathBuf::from(dir), ConfigSource::Environment);
        }

        // ROUTEATLAS_BATCH_SIZE
        if let Ok(size_str) = env::var("ROUTEATLAS_BATCH_SIZE") {
            match size_str.parse::<usize>() {
                Ok(size) if size > 0 => self.batch_size.update(size, ConfigSource::Environment),
                _ => tracing::warn!(
                    "Invalid ROUTEATLAS_BATCH_SIZE value '{}': expected positive integer",
                    size_str
                ),
            }
        }

        // ROUTEATLAS_RENDER_LIMIT
        if let Ok(limit_str) = env::var("ROUTEATLAS_RENDER_LIMIT") {
            match limit_str.parse::<usize>() {
                Ok(limit) if limit > 0 => {
                    self.render_limit.update(limit, ConfigSource::Environment)
                }
                _ => tracing::warn!(
                    "Invalid ROUTEATLAS_RENDER_LIMIT value '{}': expected positive integer",
                    limit_str
                ),
            }
        }

        // ROUTEATLAS_CATEGORY_PROPERTY
        if let Ok(property) = env::var("ROUTEATLAS_CATEGORY_PROPERTY") {
            self.category_property.update(property, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(workspace_crs) = overrides.workspace_crs {
            self.workspace_crs.update(workspace_crs, ConfigSource::Cli);
        }

        if let Some(ingest_crs) = overrides.ingest_crs {
            self.ingest_crs.update(ingest_crs, ConfigSource::Cli);
        }

        if let Some(output_dir) = overrides.output_dir {
            self.output_dir.update(output_dir, ConfigSource::Cli);
        }

        if let Some(batch_size) = overrides.batch_size {
            self.batch_size.update(batch_size, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "workspace_crs".to_string(),
            (format!("EPSG:{}", self.workspace_crs.value), self.workspace_crs.source),
        );

        map.insert(
            "ingest_crs".to_string(),
            (format!("EPSG:{}", self.ingest_crs.value), self.ingest_crs.source),
        );

        // Connection strings carry credentials, so only report presence
        map.insert(
            "database_url".to_string(),
            (
                if self.database_url.value.is_some() {
                    "(set)".to_string()
                } else {
                    "(not set)".to_string()
                },
                self.database_url.source,
            ),
        );

        map.insert(
            "output_dir".to_string(),
            (self.output_dir.value.display().to_string(), self.output_dir.source),
        );

        map.insert(
            "tile_cache_dir".to_string(),
            (self.tile_cache_dir.value.display().to_string(), self.tile_cache_dir.source),
        );

        map.insert(
            "batch_size".to_string(),
            (self.batch_size.value.to_string(), self.batch_size.source),
        );

        map.insert(
            "render_limit".to_string(),
            (self.render_limit.value.to_string(), self.render_limit.source),
        );

        map.insert(
            "category_property".to_string(),
            (self.category_property.value.clone(), self.category_property.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    workspace_crs: Option<u32>,
    ingest_crs: Option<u32>,
    database_url: Option<String>,
    output_dir: Option<PathBuf>,
    tile_cache_dir: Option<PathBuf>,
    batch_size: Option<usize>,
    render_limit: Option<usize>,
    category_property: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub workspace_crs: Option<u32>,
    pub ingest_crs: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub batch_size: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AtlasConfig::with_defaults();
        assert_eq!(config.workspace_crs.value, 4326);
        assert_eq!(config.workspace_crs.source, ConfigSource::Default);
        assert_eq!(config.ingest_crs.value, 27700);
        assert_eq!(config.batch_size.value, 1024);
        assert_eq!(config.render_limit.value, 1000);
        assert_eq!(config.category_property.value, "route_type");
        assert!(config.database_url.value.is_none());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        // File should override default
        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        // Environment should override file
        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);
        assert_eq!(value.source, ConfigSource::Environment);

        // CLI should override environment
        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400); // Still CLI value
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
workspace_crs = 4326
ingest_crs = 27700
output_dir = "processed"
batch_size = 256
category_property = "surface"
"#
        )
        .unwrap();

        let config = AtlasConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.workspace_crs.value, 4326);
        assert_eq!(config.workspace_crs.source, ConfigSource::File);
        assert_eq!(config.output_dir.value, PathBuf::from("processed"));
        assert_eq!(config.batch_size.value, 256);
        assert_eq!(config.category_property.value, "surface");
        // Unset keys keep their defaults
        assert_eq!(config.render_limit.source, ConfigSource::Default);
    }

    #[test]
    fn test_load_from_file_rejects_bad_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "batch_size = [not toml").unwrap();

        let result = AtlasConfig::with_defaults().load_from_file(file.path());
        assert!(matches!(result, Err(AtlasError::ConfigInvalid { .. })));
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        env::set_var("ROUTEATLAS_BATCH_SIZE", "512");
        env::set_var("ROUTEATLAS_WORKSPACE_CRS", "not-a-number");

        let config = AtlasConfig::with_defaults().load_from_env();

        assert_eq!(config.batch_size.value, 512);
        assert_eq!(config.batch_size.source, ConfigSource::Environment);
        // Unparseable values are ignored with a warning
        assert_eq!(config.workspace_crs.value, 4326);
        assert_eq!(config.workspace_crs.source, ConfigSource::Default);

        env::remove_var("ROUTEATLAS_BATCH_SIZE");
        env::remove_var("ROUTEATLAS_WORKSPACE_CRS");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AtlasConfig::with_defaults();

        let overrides = CliConfigOverrides {
            ingest_crs: Some(29903),
            batch_size: Some(64),
            ..Default::default()
        };

        config.update_from_cli(overrides);

        assert_eq!(config.ingest_crs.value, 29903);
        assert_eq!(config.ingest_crs.source, ConfigSource::Cli);
        assert_eq!(config.batch_size.value, 64);
        // These should still be defaults
        assert_eq!(config.workspace_crs.source, ConfigSource::Default);
        assert_eq!(config.output_dir.source, ConfigSource::Default);
    }

    #[test]
    fn test_inspection_map() {
        let config = AtlasConfig::with_defaults();
        let map = config.to_inspection_map();

        assert!(map.contains_key("workspace_crs"));
        assert!(map.contains_key("ingest_crs"));
        assert!(map.contains_key("tile_cache_dir"));

        let (crs_value, crs_source) = &map["workspace_crs"];
        assert_eq!(crs_value, "EPSG:4326");
        assert_eq!(*crs_source, ConfigSource::Default);

        let (db_value, _) = &map["database_url"];
        assert_eq!(db_value, "(not set)");
    }
}
