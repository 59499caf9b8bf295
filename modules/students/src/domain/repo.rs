use async_trait::async_trait;

use crate::contract::model::{NewStudent, Student};

/// Opens a storage session with the schema in place.
///
/// Every call runs the idempotent ensure-schema step before handing out a
/// repository, so a fresh or wiped database file is usable on the next request.
#[async_trait]
pub trait StudentsStore: Send + Sync {
    async fn connect(&self) -> anyhow::Result<Box<dyn StudentsRepository>>;
}

/// The four query shapes the service needs. Soft-deleted rows are invisible to all of them.
#[async_trait]
pub trait StudentsRepository: Send + Sync {
    /// First active row with exactly this name, lowest id wins.
    async fn find_first_by_name(&self, name: &str) -> anyhow::Result<Option<Student>>;

    /// Insert and return the persisted row with its generated id and timestamps.
    async fn insert(&self, new_student: NewStudent) -> anyhow::Result<Student>;

    /// Rename an active row; `None` when it no longer exists.
    async fn update_name(&self, id: i64, name: &str) -> anyhow::Result<Option<Student>>;

    /// Mark an active row deleted; `false` when nothing matched.
    async fn soft_delete(&self, id: i64) -> anyhow::Result<bool>;
}
