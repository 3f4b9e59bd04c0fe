use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("failed to load table: {0}")]
    DataLoad(String),
    #[error("fetch failed{}: {message}{}", status_suffix(.status), hint_suffix(.hint))]
    RemoteFetch {
        status: Option<u16>,
        message: String,
        hint: Option<&'static str>,
    },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("model not estimable: {0}")]
    ModelFit(String),
    #[error("missing column `{0}`")]
    MissingColumn(String),
}

impl AnalysisError {
    pub fn model_fit(reason: impl fmt::Display) -> Self {
        Self::ModelFit(reason.to_string())
    }

    pub fn is_model_fit(&self) -> bool {
        matches!(self, Self::ModelFit(_))
    }

    pub fn is_missing_column(&self) -> bool {
        matches!(self, Self::MissingColumn(_))
    }
}

/// Hint shown next to a failed API request, keyed by HTTP status.
pub fn status_hint(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("bad request parameters (check competition code and dates)"),
        401 | 403 => Some("invalid API key or API rate limit exceeded"),
        404 => Some("resource not found; the competition or team might not be available"),
        429 => Some("too many requests; wait a minute and retry"),
        _ => None,
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (http {s})")).unwrap_or_default()
}

fn hint_suffix(hint: &Option<&'static str>) -> String {
    hint.map(|h| format!(" [{h}]")).unwrap_or_default()
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
