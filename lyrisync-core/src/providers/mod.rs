//! Providers backed by local storage.

mod cache;
mod local_db;

pub use cache::CacheProvider;
pub use local_db::LocalDatabaseProvider;
