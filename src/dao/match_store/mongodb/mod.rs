mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoMatchStore;

use crate::dao::storage::{StorageError, StoreBackend};

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(StoreBackend::MongoDb, err)
    }
}
