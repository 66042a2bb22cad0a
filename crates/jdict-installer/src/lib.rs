mod cancel;
mod descriptor;
mod download;
mod error;
mod fs_utils;
mod layout;
mod orchestrator;
mod pipe;
mod postprocess;
mod preferences;
mod stages;
mod transcode;
mod uris;

pub use cancel::{CancellationToken, NoProgress, ProgressReporter};
pub use descriptor::{DictionaryIdentity, InstallConfig, InstallDescriptor, InstallStatus};
pub use download::fetch;
pub use error::{ErrorKind, InstallError};
pub use fs_utils::remove_file_if_exists;
pub use layout::{default_user_prefix, InstallLayout, PREFIX_ENV};
pub use orchestrator::{install, install_with_options, InstallOptions, InstallOutcome};
pub use pipe::{pipe_through, DuplexProcess, GUNZIP_ARGV};
pub use postprocess::{
    merge_radicals, split_names_places, MergeReport, SplitReport, NAME_PATTERN, PLACE_PATTERN,
};
pub use preferences::{record_installed, Preferences, TomlPreferences};
pub use transcode::{convert_encoding, ConversionReport};
pub use uris::{
    regenerate, validate, Location, StageUris, NAMES_NAME, PLACES_NAME, RADICALS_NAME,
};
