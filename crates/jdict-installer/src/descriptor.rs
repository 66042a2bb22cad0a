use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use jdict_core::{
    split_atoms, total_progress, Compression, DictionaryPreset, Engine, InstallState,
    PreferenceKey, ProgressSample, Stage, StageAtoms, TextEncoding,
};

use crate::error::InstallError;
use crate::layout::InstallLayout;
use crate::preferences::Preferences;
use crate::uris::{self, Location, StageUris};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryIdentity {
    pub filename: String,
    pub short_name: String,
    pub long_name: String,
    pub description: String,
    pub engine: Engine,
    pub builtin: bool,
}

impl DictionaryIdentity {
    pub fn new(filename: impl Into<String>, engine: Engine) -> Self {
        let filename = filename.into();
        Self {
            short_name: filename.clone(),
            long_name: filename.clone(),
            description: String::new(),
            filename,
            engine,
            builtin: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub compression: Compression,
    pub encoding: TextEncoding,
    pub split: bool,
    pub merge: bool,
    pub preference: Option<PreferenceKey>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            encoding: TextEncoding::Utf8,
            split: false,
            merge: false,
            preference: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstallStatus {
    pub stage: Stage,
    pub atom: usize,
    pub fraction: f64,
    pub state: InstallState,
}

impl Default for InstallStatus {
    fn default() -> Self {
        Self {
            stage: Stage::Downloading,
            atom: 0,
            fraction: 0.0,
            state: InstallState::NotInstalled,
        }
    }
}

/// One dictionary installation job. Stage locations are rebuilt by every
/// setter that affects them; status is shared with other threads through an
/// internal lock.
#[derive(Debug)]
pub struct InstallDescriptor {
    identity: DictionaryIdentity,
    config: InstallConfig,
    source: Vec<String>,
    layout: InstallLayout,
    uris: StageUris,
    status: Mutex<InstallStatus>,
}

impl InstallDescriptor {
    pub fn new(
        identity: DictionaryIdentity,
        config: InstallConfig,
        source: Vec<String>,
        layout: InstallLayout,
    ) -> Self {
        let mut descriptor = Self {
            identity,
            config,
            source,
            layout,
            uris: StageUris::default(),
            status: Mutex::new(InstallStatus::default()),
        };
        descriptor.regenerate();
        descriptor
    }

    pub fn from_preset(preset: &DictionaryPreset, layout: InstallLayout) -> Result<Self> {
        let identity = DictionaryIdentity {
            filename: preset.filename.clone(),
            short_name: preset.short_name.clone(),
            long_name: preset.long_name.clone(),
            description: preset.description.clone(),
            engine: preset.engine()?,
            builtin: preset.builtin,
        };
        let config = InstallConfig {
            compression: preset.compression()?,
            encoding: preset.encoding()?,
            split: preset.split,
            merge: preset.merge,
            preference: preset.preference.clone(),
        };
        Ok(Self::new(identity, config, preset.source_atoms(), layout))
    }

    pub fn identity(&self) -> &DictionaryIdentity {
        &self.identity
    }

    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn filename(&self) -> &str {
        &self.identity.filename
    }

    pub fn engine(&self) -> Engine {
        self.identity.engine
    }

    pub fn compression(&self) -> Compression {
        self.config.compression
    }

    pub fn encoding(&self) -> TextEncoding {
        self.config.encoding
    }

    pub fn split(&self) -> bool {
        self.config.split
    }

    pub fn merge(&self) -> bool {
        self.config.merge
    }

    pub fn source_uri(&self) -> &[String] {
        &self.source
    }

    pub fn uris(&self) -> &StageUris {
        &self.uris
    }

    pub fn source(&self, stage: Stage, atom: usize) -> Option<&Location> {
        self.uris.source(stage, atom)
    }

    pub fn target(&self, stage: Stage, atom: usize) -> Option<&Location> {
        self.uris.target(stage, atom)
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.identity.filename = filename.into();
        self.regenerate();
    }

    pub fn set_engine(&mut self, engine: Engine) {
        self.identity.engine = engine;
        self.regenerate();
    }

    pub fn set_compression(&mut self, compression: Compression) {
        self.config.compression = compression;
        self.regenerate();
    }

    pub fn set_encoding(&mut self, encoding: TextEncoding) {
        self.config.encoding = encoding;
        self.regenerate();
    }

    pub fn set_split(&mut self, split: bool) {
        self.config.split = split;
        self.regenerate();
    }

    pub fn set_merge(&mut self, merge: bool) {
        self.config.merge = merge;
        self.regenerate();
    }

    pub fn set_source_uri(&mut self, source: Vec<String>) {
        self.source = source;
        self.regenerate();
    }

    /// Replaces the source with the value bound in `preferences`, if the
    /// descriptor has a binding and the store holds a non-empty value.
    pub fn apply_preferences(&mut self, preferences: &dyn Preferences) -> bool {
        let Some(key) = &self.config.preference else {
            return false;
        };
        let Some(value) = preferences.source_uri(key) else {
            return false;
        };
        let atoms = split_atoms(&value);
        if atoms.is_empty() {
            return false;
        }
        self.set_source_uri(atoms);
        true
    }

    pub fn validate(&self) -> Result<(), InstallError> {
        uris::validate(self)
    }

    /// Atoms processed by each stage. Postprocessing is one pass over all of
    /// its inputs.
    pub fn atoms(&self) -> StageAtoms {
        let mut atoms = StageAtoms::new();
        for stage in [Stage::Downloading, Stage::Decompression, Stage::TextEncoding] {
            atoms.set(stage, self.uris.slot(stage).len());
        }
        atoms.set(Stage::Postprocessing, 1);
        atoms.set(Stage::Finalization, self.uris.slot(Stage::Finalization).len());
        atoms
    }

    pub fn status(&self) -> InstallStatus {
        *self.lock_status()
    }

    pub fn state(&self) -> InstallState {
        self.lock_status().state
    }

    pub fn progress(&self) -> f64 {
        let status = self.status();
        total_progress(
            &self.atoms(),
            ProgressSample::new(status.stage, status.atom, status.fraction),
        )
    }

    pub fn stage_progress(&self) -> f64 {
        let status = self.status();
        jdict_core::stage_progress(
            self.atoms().get(status.stage),
            status.atom,
            status.fraction,
        )
    }

    /// Whether every installed file of this dictionary exists on disk. Split
    /// dictionaries count as installed when either half exists.
    pub fn is_installed(&self) -> bool {
        let installed = self.uris.installed();
        if self.split() {
            return installed.iter().any(|path| path.is_file());
        }
        !installed.is_empty() && installed.iter().all(|path| path.is_file())
    }

    pub fn installed_paths(&self) -> Vec<&Path> {
        self.uris
            .slot(Stage::Nothing)
            .iter()
            .filter_map(Location::as_path)
            .collect()
    }

    pub(crate) fn update_status<F>(&self, update: F)
    where
        F: FnOnce(&mut InstallStatus),
    {
        update(&mut self.lock_status());
    }

    fn lock_status(&self) -> MutexGuard<'_, InstallStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn regenerate(&mut self) {
        self.uris = uris::regenerate(self);
    }
}
