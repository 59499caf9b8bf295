pub mod entity;
pub mod mapper;
pub mod migrations;
pub mod sea_orm_repo;
pub mod sqlite_store;

pub use sea_orm_repo::SeaOrmStudentsRepository;
pub use sqlite_store::{SqliteStudentsStore, StorageError, StoreOptions};
