use thiserror::Error;

pub type ZtmfResult<T> = Result<T, ZtmfError>;

/// Parsing itself never fails: malformed markup degrades to raw fragments.
/// These errors cover the surfaces around the parser (file access, the
/// structural check done by `ztmf check`).
#[derive(Error, Debug)]
pub enum ZtmfError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Empty document: neither a <meta> nor a <body> section was found")]
    EmptyDocument,

    #[error("Document has a <meta> section but no <body> section")]
    MissingBody,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
