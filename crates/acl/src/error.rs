//! Error types for loading permission trees

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reading permission tree: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing permission tree: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("permission tree root must be an object")]
    NotAnObject,
}

pub type Result<T> = std::result::Result<T, Error>;
