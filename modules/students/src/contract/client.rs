use async_trait::async_trait;

use crate::contract::model::{NewStudent, Student, StudentPatch};

/// Public API trait for the students module that other modules can use
#[async_trait]
pub trait StudentsApi: Send + Sync {
    /// Get the first active student with exactly this name
    async fn get_student(&self, name: &str) -> anyhow::Result<Student>;

    /// Create a new student; names are not unique
    async fn create_student(&self, new_student: NewStudent) -> anyhow::Result<Student>;

    /// Apply a partial update to the first active student with this name
    async fn update_student(&self, name: &str, patch: StudentPatch) -> anyhow::Result<Student>;

    /// Soft-delete the first active student with this name
    async fn delete_student(&self, name: &str) -> anyhow::Result<()>;
}
