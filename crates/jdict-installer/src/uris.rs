use std::fmt;
use std::path::{Path, PathBuf};

use jdict_core::{join_atoms, Stage};

use crate::descriptor::InstallDescriptor;
use crate::error::InstallError;

/// Companion dictionary joined into merge dictionaries.
pub const RADICALS_NAME: &str = "Radicals";
pub const NAMES_NAME: &str = "Names";
pub const PLACES_NAME: &str = "Places";

const UTF8_SUFFIX: &str = "UTF8";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Local(PathBuf),
    Remote(String),
}

impl Location {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if let Some(path) = trimmed.strip_prefix("file://") {
            return Self::Local(PathBuf::from(path));
        }
        let lower = trimmed.to_ascii_lowercase();
        if ["http://", "https://", "ftp://"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
        {
            return Self::Remote(trimmed.to_string());
        }
        Self::Local(PathBuf::from(trimmed))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Local(path) => path.as_os_str().is_empty(),
            Self::Remote(url) => url.is_empty(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

/// Per-stage file locations. Slot `s` holds the inputs of stage `s` and the
/// outputs of the stage before it; the `Nothing` slot holds the installed
/// files.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageUris {
    slots: [Vec<Location>; Stage::COUNT],
}

impl StageUris {
    pub fn slot(&self, stage: Stage) -> &[Location] {
        &self.slots[stage.index()]
    }

    /// Input `atom` of `stage`, or `None` once the atoms are exhausted.
    pub fn source(&self, stage: Stage, atom: usize) -> Option<&Location> {
        self.slot(stage).get(atom)
    }

    /// Output `atom` of `stage`, or `None` once the atoms are exhausted.
    pub fn target(&self, stage: Stage, atom: usize) -> Option<&Location> {
        if stage == Stage::Nothing {
            return None;
        }
        self.slot(stage.next()).get(atom)
    }

    pub fn source_path(&self, stage: Stage, atom: usize) -> Option<&Path> {
        self.source(stage, atom).and_then(Location::as_path)
    }

    pub fn target_path(&self, stage: Stage, atom: usize) -> Option<&Path> {
        self.target(stage, atom).and_then(Location::as_path)
    }

    pub fn joined(&self, stage: Stage) -> String {
        let rendered = self
            .slot(stage)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        join_atoms(&rendered)
    }

    /// Files written by the stages before finalization.
    pub fn intermediates(&self) -> Vec<PathBuf> {
        [
            Stage::Decompression,
            Stage::TextEncoding,
            Stage::Postprocessing,
            Stage::Finalization,
        ]
        .iter()
        .flat_map(|stage| self.slot(*stage))
        .filter_map(Location::as_path)
        .map(Path::to_path_buf)
        .collect()
    }

    pub fn installed(&self) -> Vec<PathBuf> {
        self.slot(Stage::Nothing)
            .iter()
            .filter_map(Location::as_path)
            .map(Path::to_path_buf)
            .collect()
    }

    fn push(&mut self, stage: Stage, location: Location) {
        self.slots[stage.index()].push(location);
    }
}

/// Derives every stage location from the descriptor's name, engine,
/// compression, encoding, split and merge settings. Depends on nothing else,
/// so identical inputs always produce identical locations.
pub fn regenerate(descriptor: &InstallDescriptor) -> StageUris {
    let layout = descriptor.layout();
    let name = descriptor.filename();
    let engine = descriptor.engine();
    let compression_ext = descriptor.compression().cache_extension();
    let encoding_ext = descriptor.encoding().as_str();

    let mut uris = StageUris::default();
    for source in descriptor.source_uri() {
        uris.push(Stage::Downloading, Location::parse(source));
    }

    let mut cached = vec![name];
    if descriptor.merge() {
        cached.push(RADICALS_NAME);
    }
    for base in &cached {
        uris.push(
            Stage::Decompression,
            Location::Local(layout.cache_path(&format!("{base}.{compression_ext}"))),
        );
        uris.push(
            Stage::TextEncoding,
            Location::Local(layout.cache_path(&format!("{base}.{encoding_ext}"))),
        );
        uris.push(
            Stage::Postprocessing,
            Location::Local(layout.cache_path(&format!("{base}.{UTF8_SUFFIX}"))),
        );
    }

    let finals: Vec<&str> = if descriptor.split() {
        vec![NAMES_NAME, PLACES_NAME]
    } else {
        vec![name]
    };
    for base in finals {
        uris.push(Stage::Finalization, Location::Local(layout.cache_path(base)));
        uris.push(
            Stage::Nothing,
            Location::Local(layout.installed_path(engine, base)),
        );
    }

    uris
}

pub fn validate(descriptor: &InstallDescriptor) -> Result<(), InstallError> {
    let invalid = |message: String| Err(InstallError::InvalidDescriptor(message));

    let filename = descriptor.filename();
    if filename.trim().is_empty() {
        return invalid("filename must not be empty".to_string());
    }
    if filename.contains(['/', '\\', ';']) || filename == "." || filename == ".." {
        return invalid(format!(
            "filename '{filename}' must be a plain file name without path or list separators"
        ));
    }
    if descriptor.merge() && filename == RADICALS_NAME {
        return invalid(format!(
            "merge dictionary cannot be named '{RADICALS_NAME}'; that name is reserved for its companion"
        ));
    }
    if descriptor.split() && descriptor.merge() {
        return invalid(format!(
            "dictionary '{}' cannot be both split and merged",
            descriptor.filename()
        ));
    }

    let uris = descriptor.uris();
    for stage in Stage::ALL {
        let slot = uris.slot(stage);
        if slot.is_empty() || slot.iter().any(Location::is_empty) {
            return invalid(format!(
                "dictionary '{}' has no {} location",
                descriptor.filename(),
                stage.as_str()
            ));
        }
    }

    let expected = if descriptor.merge() { 2 } else { 1 };
    let sources = uris.slot(Stage::Downloading).len();
    if sources != expected {
        return invalid(format!(
            "dictionary '{}' needs exactly {expected} source location(s), found {sources}: '{}'",
            descriptor.filename(),
            uris.joined(Stage::Downloading)
        ));
    }

    Ok(())
}
