use thiserror::Error;

/// Failures of the listing pipeline.
///
/// `Network` covers non-success responses, transport failures and timeouts.
/// `Parse` is a document that is not a well-formed bucket listing.
/// `Validation` is a single entry (fetched or cached) missing required fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl SeedError {
    /// Short label for log lines and the error panel's data attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
            Self::Validation(_) => "validation",
        }
    }
}

impl From<reqwest::Error> for SeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("request timed out: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<quick_xml::de::DeError> for SeedError {
    fn from(err: quick_xml::de::DeError) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SeedError>;
