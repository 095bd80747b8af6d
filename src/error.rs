pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Queue is full ({length}/{limit} packets), packet dropped")]
    Overlimit { length: usize, limit: usize },
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Unknown interface \"{0}\"")]
    UnknownInterface(String),
    #[error("Interface \"{0}\" already has a CoDel queue attached")]
    AlreadyAttached(String),
    #[error("CoDel is disabled on interface \"{0}\"")]
    InterfaceDisabled(String),
    #[error("Encounter IO error, {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl Error {
    /// Overlimit drops are part of normal operation and are only counted.
    pub fn is_overlimit(&self) -> bool {
        matches!(self, Error::Overlimit { .. })
    }
}
