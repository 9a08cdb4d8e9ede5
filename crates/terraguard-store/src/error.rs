use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("facility directory not found: {0}")]
    DirectoryNotFound(std::path::PathBuf),

    #[error("duplicate facility id: {0}")]
    DuplicateId(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
