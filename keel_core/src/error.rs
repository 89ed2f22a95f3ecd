use thiserror::Error;

/// Errors raised by the keel core.
///
/// Content problems found while loading the persistent region (missing
/// magic, bad checksum, foreign data) are not errors; they are reported
/// through [`crate::persistence::LoadOutcome`].
#[derive(Debug, Error)]
pub enum KeelError {
    /// Invalid static configuration: duplicate or reserved module id,
    /// registry capacity exhausted, unreadable config file.
    #[error("configuration error: {0}")]
    Config(String),

    /// A module tried to write past the window reserved for its record.
    #[error("module {module_id} write of {requested} bytes rejected ({remaining} bytes left in window)")]
    WriteOverflow {
        module_id: u8,
        requested: usize,
        remaining: usize,
    },

    /// Access outside the persistent region or a record stream that does
    /// not fit into it.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type KeelResult<T> = std::result::Result<T, KeelError>;

impl KeelError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for errors that must abort startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
