use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Why a document could not be fetched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("document not found")]
    NotFound,

    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("{0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to fetch '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Invalid URL '{input}': {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Component '{component}' failed: {reason}")]
    Component { component: String, reason: String },

    #[error("Background provider '{provider}' failed: {reason}")]
    Provider { provider: String, reason: String },

    #[error("Background provider '{0}' is not available")]
    ProviderNotFound(String),
}

impl From<serde_yaml::Error> for RuntimeError {
    fn from(err: serde_yaml::Error) -> Self {
        RuntimeError::Config(err.to_string())
    }
}

impl RuntimeError {
    pub fn component(component: &str, reason: impl Into<String>) -> Self {
        RuntimeError::Component {
            component: component.to_string(),
            reason: reason.into(),
        }
    }

    pub fn provider(provider: &str, reason: impl Into<String>) -> Self {
        RuntimeError::Provider {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }
}
