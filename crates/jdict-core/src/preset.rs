use std::collections::HashSet;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::compression::Compression;
use crate::encoding::TextEncoding;
use crate::engine::Engine;

pub const PREFERENCE_SCHEMA: &str = "org.jdict.dictionary";

const EDRDG_MIRROR: &str = "http://ftp.edrdg.org/pub/Nihongo";

/// Location in the preference store that can override a dictionary's source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PreferenceKey {
    pub schema: String,
    pub key: String,
}

impl PreferenceKey {
    pub fn new(schema: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DictionaryPreset {
    pub filename: String,
    pub short_name: String,
    pub long_name: String,
    #[serde(default)]
    pub description: String,
    pub engine: String,
    pub source: String,
    pub compression: Option<String>,
    pub encoding: String,
    #[serde(default)]
    pub split: bool,
    #[serde(default)]
    pub merge: bool,
    pub preference: Option<PreferenceKey>,
    #[serde(default)]
    pub builtin: bool,
}

#[derive(Debug, Deserialize)]
struct PresetFile {
    #[serde(default)]
    dictionaries: Vec<DictionaryPreset>,
}

impl DictionaryPreset {
    pub fn engine(&self) -> anyhow::Result<Engine> {
        Engine::parse(&self.engine).ok_or_else(|| {
            anyhow!(
                "unsupported engine '{}' for dictionary '{}'; supported: edict, kanji, examples, unknown",
                self.engine,
                self.filename
            )
        })
    }

    pub fn encoding(&self) -> anyhow::Result<TextEncoding> {
        TextEncoding::parse(&self.encoding).ok_or_else(|| {
            anyhow!(
                "unsupported encoding '{}' for dictionary '{}'; supported: UTF-8, EUC-JP, SHIFT_JIS",
                self.encoding,
                self.filename
            )
        })
    }

    pub fn compression(&self) -> anyhow::Result<Compression> {
        if let Some(compression) = &self.compression {
            return Compression::parse(compression).ok_or_else(|| {
                anyhow!(
                    "unsupported compression '{compression}' for dictionary '{}'; supported: none, gzip",
                    self.filename
                )
            });
        }

        let first = self.source_atoms().into_iter().next().unwrap_or_default();
        Ok(Compression::infer_from_url(&first))
    }

    pub fn source_atoms(&self) -> Vec<String> {
        split_atoms(&self.source)
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.filename.trim().is_empty() {
            return Err(anyhow!("dictionary filename must not be empty"));
        }
        if self.filename.contains(['/', '\\', ';']) || self.filename == "." || self.filename == ".." {
            return Err(anyhow!(
                "dictionary filename must be a plain file name: {}",
                self.filename
            ));
        }
        self.engine()?;
        self.encoding()?;
        self.compression()?;
        if self.split && self.merge {
            return Err(anyhow!(
                "dictionary '{}' cannot be both split and merged",
                self.filename
            ));
        }

        let expected = if self.merge { 2 } else { 1 };
        let atoms = self.source_atoms();
        if atoms.len() != expected || atoms.iter().any(|atom| atom.is_empty()) {
            return Err(anyhow!(
                "dictionary '{}' needs exactly {expected} source location(s), found '{}'",
                self.filename,
                self.source
            ));
        }
        Ok(())
    }
}

pub fn parse_presets(input: &str) -> anyhow::Result<Vec<DictionaryPreset>> {
    let file: PresetFile = toml::from_str(input).context("failed to parse dictionary presets")?;
    let mut seen = HashSet::new();
    for preset in &file.dictionaries {
        preset
            .validate()
            .with_context(|| format!("invalid dictionary preset '{}'", preset.filename))?;
        if !seen.insert(preset.filename.clone()) {
            return Err(anyhow!(
                "duplicate dictionary preset '{}'",
                preset.filename
            ));
        }
    }
    Ok(file.dictionaries)
}

/// Splits a `;`-joined location list. An empty input has no atoms.
pub fn split_atoms(joined: &str) -> Vec<String> {
    if joined.trim().is_empty() {
        return Vec::new();
    }
    joined.split(';').map(|atom| atom.trim().to_string()).collect()
}

pub fn join_atoms<S: AsRef<str>>(atoms: &[S]) -> String {
    atoms
        .iter()
        .map(|atom| atom.as_ref())
        .collect::<Vec<_>>()
        .join(";")
}

pub fn builtin_presets() -> Vec<DictionaryPreset> {
    vec![
        builtin(
            "English",
            "English",
            "English Dictionary",
            "The venerable Japanese-English dictionary developed by Jim Breen.",
            Engine::Edict,
            format!("{EDRDG_MIRROR}/edict.gz"),
            TextEncoding::EucJp,
            (false, false),
            "english-source",
        ),
        builtin(
            "Kanji",
            "Kanji",
            "Kanji Dictionary",
            "A Kanji dictionary based off of kanjidic with radical information combined from kradfile.",
            Engine::Kanji,
            format!("{EDRDG_MIRROR}/kanjidic.gz;{EDRDG_MIRROR}/kradfile.gz"),
            TextEncoding::EucJp,
            (false, true),
            "kanji-source",
        ),
        builtin(
            "Names",
            "Names and Places",
            "Names and Places Dictionary",
            "Based off of Enamdict. Split into separate Names and Places dictionaries.",
            Engine::Edict,
            format!("{EDRDG_MIRROR}/enamdict.gz"),
            TextEncoding::EucJp,
            (true, false),
            "names-places-source",
        ),
        builtin(
            "Examples",
            "Examples",
            "Examples Dictionary",
            "A collection of Japanese/English sentence pairs.",
            Engine::Examples,
            format!("{EDRDG_MIRROR}/examples.utf.gz"),
            TextEncoding::Utf8,
            (false, false),
            "examples-source",
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn builtin(
    filename: &str,
    short_name: &str,
    long_name: &str,
    description: &str,
    engine: Engine,
    source: String,
    encoding: TextEncoding,
    (split, merge): (bool, bool),
    preference_key: &str,
) -> DictionaryPreset {
    DictionaryPreset {
        filename: filename.to_string(),
        short_name: short_name.to_string(),
        long_name: long_name.to_string(),
        description: description.to_string(),
        engine: engine.as_str().to_string(),
        source,
        compression: Some(Compression::Gzip.as_str().to_string()),
        encoding: encoding.as_str().to_string(),
        split,
        merge,
        preference: Some(PreferenceKey::new(PREFERENCE_SCHEMA, preference_key)),
        builtin: true,
    }
}
