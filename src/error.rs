use serde::Serialize;

/// Why a data-access call fell back to a placeholder value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        if err.is_decode() {
            return Self::Malformed(format!("{err:#}"));
        }
        Self::Network(format!("{err:#}"))
    }
}

/// Outcome of a fetch that never fails outright.
///
/// `Fallback` still carries a usable value (a placeholder or an empty list) so
/// rendering code can proceed, but callers can tell it apart from real data.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Loaded(T),
    Fallback { value: T, reason: FetchError },
}

impl<T> Fetched<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Loaded(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Loaded(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn reason(&self) -> Option<&FetchError> {
        match self {
            Self::Loaded(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn status(&self) -> FetchStatus {
        match self {
            Self::Loaded(_) => FetchStatus::Loaded,
            Self::Fallback { .. } => FetchStatus::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Loaded,
    Fallback,
}
