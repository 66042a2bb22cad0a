use anyhow::{Context, Result};
use jdict_core::Engine;
use std::fs;
use std::path::{Path, PathBuf};

pub const PREFIX_ENV: &str = "JDICT_PREFIX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    prefix: PathBuf,
}

impl InstallLayout {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.prefix.join("cache")
    }

    pub fn dictionaries_dir(&self) -> PathBuf {
        self.prefix.join("dictionaries")
    }

    pub fn engine_dir(&self, engine: Engine) -> PathBuf {
        self.dictionaries_dir().join(engine.directory_name())
    }

    pub fn cache_path(&self, file_name: &str) -> PathBuf {
        self.cache_dir().join(file_name)
    }

    pub fn installed_path(&self, engine: Engine, file_name: &str) -> PathBuf {
        self.engine_dir(engine).join(file_name)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.prefix.join("preferences.toml")
    }

    pub fn presets_path(&self) -> PathBuf {
        self.prefix.join("dictionaries.toml")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        let mut dirs = vec![self.cache_dir(), self.dictionaries_dir()];
        dirs.extend(
            [
                Engine::Edict,
                Engine::Kanji,
                Engine::Examples,
                Engine::Unknown,
            ]
            .into_iter()
            .map(|engine| self.engine_dir(engine)),
        );
        for dir in dirs {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_user_prefix() -> Result<PathBuf> {
    if let Some(prefix) = std::env::var_os(PREFIX_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(prefix));
    }

    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows user prefix")?;
        return Ok(PathBuf::from(app_data).join("jdict"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve user prefix")?;
    Ok(PathBuf::from(home).join(".jdict"))
}
