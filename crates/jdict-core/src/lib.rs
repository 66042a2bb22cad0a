mod compression;
mod encoding;
mod engine;
mod preset;
mod progress;
mod stage;

pub use compression::Compression;
pub use encoding::TextEncoding;
pub use engine::Engine;
pub use preset::{
    builtin_presets, join_atoms, parse_presets, split_atoms, DictionaryPreset, PreferenceKey,
    PREFERENCE_SCHEMA,
};
pub use progress::{
    stage_progress, stage_weight, total_progress, ProgressSample, StageAtoms, DOWNLOAD_WEIGHT,
};
pub use stage::{InstallState, Stage};

#[cfg(test)]
mod tests;
