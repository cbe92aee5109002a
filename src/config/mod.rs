//! Configuration
//!
//! Settings for analysis sampling, selector thresholds, renderer tools and
//! optional LLM refinement. Later sources override earlier ones:
//!
//! - compiled-in defaults
//! - `$XDG_CONFIG_HOME/typecraft/config.toml` (or `~/.config/typecraft/config.toml`)
//! - `./typecraft.toml`
//! - `TYPECRAFT_*` environment variables, nested with `__`
//!
//! Command-line flags are applied on top by the individual commands.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
