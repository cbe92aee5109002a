//! Config Command
//!
//! Manage Typecraft configuration.
//!
//! Usage:
//!   typecraft config show [--json]
//!   typecraft config path
//!   typecraft config init [--global] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::{Result, TypecraftError};

/// Print the effective configuration (defaults, files and environment merged)
pub fn show(as_json: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("{}", ConfigLoader::render(&config, as_json)?);
    Ok(())
}

/// Print where configuration is read from
pub fn path() -> Result<()> {
    let output = Output::new();
    match ConfigLoader::global_config_path() {
        Some(global) => output.field(
            "global",
            format!(
                "{}{}",
                global.display(),
                if global.exists() { "" } else { " (not found)" }
            ),
        ),
        None => output.field("global", "(no config directory)"),
    }
    let project = ConfigLoader::project_config_path();
    output.field(
        "project",
        format!(
            "{}{}",
            project.display(),
            if project.exists() { "" } else { " (not found)" }
        ),
    );
    output.field("environment", "TYPECRAFT_<SECTION>__<KEY>");
    Ok(())
}

/// Write a default config file
pub fn init(global: bool, force: bool) -> Result<()> {
    let path = if global {
        ConfigLoader::global_config_path().ok_or_else(|| {
            TypecraftError::Config("Cannot determine global config directory".to_string())
        })?
    } else {
        ConfigLoader::project_config_path()
    };

    let output = Output::new();
    if ConfigLoader::init_at(&path, force)? {
        output.success(&format!("Created {}", path.display()));
    } else {
        output.warning(&format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    Ok(())
}
