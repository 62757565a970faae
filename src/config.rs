use std::path::PathBuf;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

pub const DEFAULT_EDITABLE_ATTRIBUTE: &str = "data-editable";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// SQLite database file.
    pub database: PathBuf,
    /// Directory scanned by `import` for `*.html`, `styles.css` and `assets/`.
    pub import_dir: PathBuf,
    /// Root that receives `css/<slug>.css` and `assets/<slug>/`.
    pub public_dir: PathBuf,
    /// Attribute flagging an element as a field.
    pub editable_attribute: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database: PathBuf::from("data/pages.sqlite"),
            import_dir: PathBuf::from("import"),
            public_dir: PathBuf::from("public"),
            editable_attribute: DEFAULT_EDITABLE_ATTRIBUTE.to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then `pageblocks.toml` if present, then `PAGEBLOCKS_*` variables.
    pub fn load() -> Result<Self> {
        with_defaults()?
            .add_source(File::with_name("pageblocks").required(false))
            .add_source(Environment::with_prefix("PAGEBLOCKS"))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }
}

fn with_defaults() -> Result<ConfigBuilder<DefaultState>> {
    let d = Settings::default();
    Ok(Config::builder()
        .set_default("database", d.database.to_string_lossy().into_owned())?
        .set_default("import_dir", d.import_dir.to_string_lossy().into_owned())?
        .set_default("public_dir", d.public_dir.to_string_lossy().into_owned())?
        .set_default("editable_attribute", d.editable_attribute)?)
}
