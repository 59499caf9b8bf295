use crate::contract::model::Student;
use crate::infra::storage::entity::Model as StudentEntity;

impl From<StudentEntity> for Student {
    fn from(e: StudentEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            created_at: e.created_at,
            updated_at: e.updated_at,
            deleted_at: e.deleted_at,
        }
    }
}
