use thiserror::Error;

#[derive(Debug, Error)]
pub enum VinslyError {
    #[error("invalid entry name '{name}': {reason}")]
    InvalidEntryName { name: String, reason: String },

    #[error("refusing to modify files outside .claude/{0}")]
    OutsideClaudeDir(String),

    #[error("project scope requires a project path")]
    ProjectPathRequired,

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{what} is too large ({size} bytes, limit {limit} bytes)")]
    TooLarge {
        what: String,
        size: u64,
        limit: u64,
    },

    #[error("{0} timed out")]
    Timeout(String),

    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    #[error("task join error: {0}")]
    Join(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, VinslyError>;
