#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Downloading,
    Decompression,
    TextEncoding,
    Postprocessing,
    Finalization,
    Nothing,
}

impl Stage {
    /// Number of stages, `Nothing` included.
    pub const COUNT: usize = 6;

    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::Downloading,
        Stage::Decompression,
        Stage::TextEncoding,
        Stage::Postprocessing,
        Stage::Finalization,
        Stage::Nothing,
    ];

    /// Stages that do work, in execution order.
    pub const TRANSFORMS: [Stage; 5] = [
        Stage::Downloading,
        Stage::Decompression,
        Stage::TextEncoding,
        Stage::Postprocessing,
        Stage::Finalization,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Self {
        match self {
            Self::Downloading => Self::Decompression,
            Self::Decompression => Self::TextEncoding,
            Self::TextEncoding => Self::Postprocessing,
            Self::Postprocessing => Self::Finalization,
            Self::Finalization | Self::Nothing => Self::Nothing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::Decompression => "decompression",
            Self::TextEncoding => "text-encoding",
            Self::Postprocessing => "postprocessing",
            Self::Finalization => "finalization",
            Self::Nothing => "installed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallState {
    NotInstalled,
    Installing,
    Installed,
    Errored,
    Canceling,
}

impl InstallState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotInstalled => "not-installed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Errored => "errored",
            Self::Canceling => "canceling",
        }
    }
}
