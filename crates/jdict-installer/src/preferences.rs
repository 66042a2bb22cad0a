use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jdict_core::PreferenceKey;
use serde::{Deserialize, Serialize};

use crate::descriptor::InstallDescriptor;
use crate::fs_utils::{ensure_parent_dir, write_via_part};

/// Preference storage consulted for source overrides and written with the
/// dictionary load order.
pub trait Preferences {
    fn source_uri(&self, key: &PreferenceKey) -> Option<String>;
    fn set_source_uri(&mut self, key: &PreferenceKey, value: &str) -> Result<()>;
    fn load_order(&self) -> Vec<String>;
    fn set_load_order(&mut self, order: &[String]) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
struct PreferencesFile {
    #[serde(default)]
    load_order: Vec<String>,
    #[serde(default)]
    sources: BTreeMap<String, BTreeMap<String, String>>,
}

/// Preferences kept in a TOML file, rewritten on every change.
#[derive(Debug, Clone)]
pub struct TomlPreferences {
    path: PathBuf,
    data: PreferencesFile,
}

impl TomlPreferences {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read preferences: {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("failed to parse preferences: {}", path.display()))?
        } else {
            PreferencesFile::default()
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let rendered =
            toml::to_string(&self.data).context("failed to serialize preferences")?;
        ensure_parent_dir(&self.path)?;
        write_via_part(&self.path, |part| {
            fs::write(part, rendered.as_bytes())
                .with_context(|| format!("failed to write preferences: {}", part.display()))
        })
    }
}

impl Preferences for TomlPreferences {
    fn source_uri(&self, key: &PreferenceKey) -> Option<String> {
        self.data
            .sources
            .get(&key.schema)
            .and_then(|schema| schema.get(&key.key))
            .cloned()
    }

    fn set_source_uri(&mut self, key: &PreferenceKey, value: &str) -> Result<()> {
        self.data
            .sources
            .entry(key.schema.clone())
            .or_default()
            .insert(key.key.clone(), value.to_string());
        self.save()
    }

    fn load_order(&self) -> Vec<String> {
        self.data.load_order.clone()
    }

    fn set_load_order(&mut self, order: &[String]) -> Result<()> {
        self.data.load_order = order.to_vec();
        self.save()
    }
}

/// Appends the descriptor's installed dictionaries to the persisted load
/// order, keeping existing entries in place.
pub fn record_installed(
    preferences: &mut dyn Preferences,
    descriptor: &InstallDescriptor,
) -> Result<bool> {
    let mut order = preferences.load_order();
    let mut changed = false;
    for path in descriptor.installed_paths() {
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let entry = format!("{}/{name}", descriptor.engine().as_str());
        if !order.contains(&entry) {
            order.push(entry);
            changed = true;
        }
    }
    if changed {
        preferences.set_load_order(&order)?;
    }
    Ok(changed)
}
