pub mod config;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

pub use config::{AppConfig, LocalConfig};

const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "tutr";
const APP_NAME: &str = "tutr";
const DB_FILENAME: &str = "tutr.sqlite3";
const CONFIG_FILENAME: &str = "config.toml";

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "TUTR_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not resolve user data directory")]
    MissingUserDataDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("could not serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).ok_or(Error::MissingUserDataDir)
}

/// App-local user data directory (for durable application state).
pub fn user_data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_local_dir().to_path_buf())
}

pub fn ensure_user_data_dir() -> Result<PathBuf> {
    let dir = user_data_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// SQLite file holding study plans and chat history.
pub fn database_path() -> Result<PathBuf> {
    Ok(ensure_user_data_dir()?.join(DB_FILENAME))
}

/// `$TUTR_CONFIG` if set, else `config.toml` in the platform config dir.
pub fn config_path() -> Result<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(project_dirs()?.config_dir().join(CONFIG_FILENAME)),
    }
}

pub fn load_config() -> Result<AppConfig> {
    AppConfig::load(&config_path()?)
}

pub fn save_config(config: &AppConfig) -> Result<PathBuf> {
    let path = config_path()?;
    config.save(&path)?;
    Ok(path)
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}
