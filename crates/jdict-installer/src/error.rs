use jdict_core::Stage;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidDescriptor,
    Download,
    Decompress,
    EncodingConversion,
    Postprocess,
    Finalize,
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid install descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("download failed: {0:#}")]
    Download(anyhow::Error),
    #[error("decompression failed: {0:#}")]
    Decompress(anyhow::Error),
    #[error("text encoding conversion failed: {0:#}")]
    EncodingConversion(anyhow::Error),
    #[error("postprocessing failed: {0:#}")]
    Postprocess(anyhow::Error),
    #[error("finalization failed: {0:#}")]
    Finalize(anyhow::Error),
}

impl InstallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDescriptor(_) => ErrorKind::InvalidDescriptor,
            Self::Download(_) => ErrorKind::Download,
            Self::Decompress(_) => ErrorKind::Decompress,
            Self::EncodingConversion(_) => ErrorKind::EncodingConversion,
            Self::Postprocess(_) => ErrorKind::Postprocess,
            Self::Finalize(_) => ErrorKind::Finalize,
        }
    }

    pub(crate) fn from_stage(stage: Stage, err: anyhow::Error) -> Self {
        match stage {
            Stage::Downloading => Self::Download(err),
            Stage::Decompression => Self::Decompress(err),
            Stage::TextEncoding => Self::EncodingConversion(err),
            Stage::Postprocessing => Self::Postprocess(err),
            Stage::Finalization | Stage::Nothing => Self::Finalize(err),
        }
    }
}

/// Marker carried through anyhow chains when an install stops because it was
/// asked to.
#[derive(Debug, Error)]
#[error("installation canceled")]
pub(crate) struct Canceled;

pub(crate) fn is_canceled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<Canceled>())
}
