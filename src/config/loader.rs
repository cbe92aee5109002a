//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/typecraft/config.toml)
//! 3. Project config (./typecraft.toml)
//! 4. Environment variables (TYPECRAFT_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{Result, TypecraftError};

/// Environment variable prefix
const ENV_PREFIX: &str = "TYPECRAFT_";

/// Project-level config file name
const PROJECT_CONFIG_FILE: &str = "typecraft.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_with(Self::global_config_path(), Self::project_config_path())
    }

    /// Load with explicit file locations; missing files are skipped
    pub fn load_with(global: Option<PathBuf>, project: PathBuf) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(&project));
        }

        // e.g. TYPECRAFT_RENDER__TIMEOUT_MS -> render.timeout_ms
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| TypecraftError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| TypecraftError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/typecraft/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("typecraft"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render the effective configuration as TOML or JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| TypecraftError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a commented default config file; existing files are kept unless forced
    pub fn init_at(path: &Path, force: bool) -> Result<bool> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(false);
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Self::default_config())?;
        info!("Created config: {}", path.display());
        Ok(true)
    }

    /// Default config content (TOML)
    fn default_config() -> String {
        r#"# Typecraft Configuration
# Project settings in ./typecraft.toml override the global file.
# Environment variables override both, e.g. TYPECRAFT_RENDER__TIMEOUT_MS=60000

version = "1.0"

[analysis]
sample_size = 5000

[selector]
equations_min = 10
academic_conf_min = 0.7
complex_tables_min = 5
image_ratio_min = 0.1
neutral_zone = 0.2
fallback = "web"

[render]
timeout_ms = 120000
output_dir = "output"
page_format = "6x9"
latex_engine = "lualatex"
latex_runs = 2
paged_command = "pagedjs-cli"
zip_command = "zip"
pdfinfo_command = "pdfinfo"
typography = true

# Optional profile refinement (api key via TYPECRAFT_LLM__API_KEY or OPENAI_API_KEY)
[llm]
enabled = false
provider = "openai"
model = "gpt-4o-mini"
timeout_secs = 60
temperature = 0.2
max_retries = 2
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let config =
            ConfigLoader::load_with(None, temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.render.zip_command, "zip");
    }

    #[test]
    fn test_project_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("typecraft.toml");
        fs::write(&global, "[render]\ntimeout_ms = 5000\nlatex_engine = \"xelatex\"\n").unwrap();
        fs::write(&project, "[render]\ntimeout_ms = 9000\n").unwrap();

        let config = ConfigLoader::load_with(Some(global), project).unwrap();
        assert_eq!(config.render.timeout_ms, 9000);
        assert_eq!(config.render.latex_engine, "xelatex");
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("typecraft.toml");
        fs::write(&path, "[selector]\nneutral_zone = 4.0\n").unwrap();
        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, TypecraftError::Config(_)));
    }

    #[test]
    fn test_init_writes_loadable_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/typecraft.toml");
        assert!(ConfigLoader::init_at(&path, false).unwrap());
        assert!(!ConfigLoader::init_at(&path, false).unwrap());
        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.selector.neutral_zone, 0.2);
    }

    #[test]
    fn test_render_toml_and_json() {
        let config = Config::default();
        let toml_out = ConfigLoader::render(&config, false).unwrap();
        assert!(toml_out.contains("[selector]"));
        let json_out = ConfigLoader::render(&config, true).unwrap();
        assert!(json_out.contains("\"neutral_zone\""));
    }
}
