#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Engine {
    Edict,
    Kanji,
    Examples,
    Unknown,
}

impl Engine {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edict => "edict",
            Self::Kanji => "kanji",
            Self::Examples => "examples",
            Self::Unknown => "unknown",
        }
    }

    /// Name of the per-engine directory installed dictionaries land in.
    pub fn directory_name(self) -> &'static str {
        self.as_str()
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "edict" => Some(Self::Edict),
            "kanji" | "kanjidic" => Some(Self::Kanji),
            "examples" => Some(Self::Examples),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}
