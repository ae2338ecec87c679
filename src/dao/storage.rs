use std::{error::Error, fmt};

use thiserror::Error;

/// Result alias for match store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Which match store produced a failure; used in logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    MongoDb,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreBackend::Memory => "memory",
            StoreBackend::MongoDb => "mongodb",
        })
    }
}

/// Backend-agnostic failure of the persistence collaborator.
///
/// Services never inspect the source; every variant is reported to clients
/// as the `unavailable` kind.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{backend} store unavailable: {message}")]
    Unavailable {
        backend: StoreBackend,
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Wrap a backend failure.
    pub fn unavailable(
        backend: StoreBackend,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            backend,
            message: source.to_string(),
            source: Box::new(source),
        }
    }

    pub fn backend(&self) -> StoreBackend {
        match self {
            StorageError::Unavailable { backend, .. } => *backend,
        }
    }
}
