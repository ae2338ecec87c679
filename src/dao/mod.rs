/// Match store trait and its backends.
pub mod match_store;
/// Domain records shared by every backend.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
