#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
        }
    }

    /// Suffix of the downloaded file in the cache directory.
    pub fn cache_extension(self) -> &'static str {
        match self {
            Self::None => "uncompressed",
            Self::Gzip => "gz",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "none" | "uncompressed" | "" => Some(Self::None),
            "gzip" | "gz" => Some(Self::Gzip),
            _ => None,
        }
    }

    pub fn infer_from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        let without_fragment = lower.split('#').next().unwrap_or(&lower);
        let without_query = without_fragment
            .split('?')
            .next()
            .unwrap_or(without_fragment);
        if without_query.ends_with(".gz") || without_query.ends_with(".gzip") {
            return Self::Gzip;
        }
        Self::None
    }
}
