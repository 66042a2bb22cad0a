use encoding_rs::{Encoding, EUC_JP, SHIFT_JIS, UTF_8};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    Utf8,
    EucJp,
    ShiftJis,
}

impl TextEncoding {
    /// Canonical charset label, also used as the cache suffix of the
    /// decompressed file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::EucJp => "EUC-JP",
            Self::ShiftJis => "SHIFT_JIS",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "euc-jp" | "eucjp" => Some(Self::EucJp),
            "shift-jis" | "shiftjis" | "sjis" => Some(Self::ShiftJis),
            _ => None,
        }
    }

    pub fn encoding(self) -> &'static Encoding {
        match self {
            Self::Utf8 => UTF_8,
            Self::EucJp => EUC_JP,
            Self::ShiftJis => SHIFT_JIS,
        }
    }
}
