use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::contract::model::{NewStudent, Student, StudentPatch};
use crate::domain::error::DomainError;
use crate::domain::repo::{StudentsRepository, StudentsStore};

/// Domain service with the business rules for student records.
/// Depends only on the storage ports, never on a concrete database.
pub struct Service {
    store: Arc<dyn StudentsStore>,
}

impl Service {
    pub fn new(store: Arc<dyn StudentsStore>) -> Self {
        Self { store }
    }

    async fn repo(&self) -> Result<Box<dyn StudentsRepository>, DomainError> {
        self.store
            .connect()
            .await
            .map_err(|e| DomainError::storage_unavailable(format!("{e:#}")))
    }

    #[instrument(name = "students.service.get_student", skip(self))]
    pub async fn get_student(&self, name: &str) -> Result<Student, DomainError> {
        debug!("Getting student by name");

        let repo = self.repo().await?;
        repo.find_first_by_name(name)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::student_not_found(name))
    }

    #[instrument(name = "students.service.create_student", skip(self), fields(name = %new_student.name))]
    pub async fn create_student(&self, new_student: NewStudent) -> Result<Student, DomainError> {
        let repo = self.repo().await?;
        let student = repo
            .insert(new_student)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;

        info!(id = student.id, "Created student");
        Ok(student)
    }

    /// Apply `patch` to a record previously returned by [`Service::get_student`].
    ///
    /// An absent or empty name is a no-op and hands `current` back untouched.
    #[instrument(name = "students.service.update_student", skip(self, current), fields(id = current.id))]
    pub async fn update_student(
        &self,
        current: Student,
        patch: StudentPatch,
    ) -> Result<Student, DomainError> {
        let Some(new_name) = patch.effective_name() else {
            debug!("Empty patch, nothing to update");
            return Ok(current);
        };

        let repo = self.repo().await?;
        let updated = repo
            .update_name(current.id, new_name)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::student_not_found(current.name.clone()))?;

        info!(from = %current.name, to = %updated.name, "Renamed student");
        Ok(updated)
    }

    #[instrument(name = "students.service.delete_student", skip(self))]
    pub async fn delete_student(&self, name: &str) -> Result<(), DomainError> {
        let repo = self.repo().await?;

        // A failed lookup reads as "not found" to the caller.
        let student = match repo.find_first_by_name(name).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Lookup before delete failed");
                None
            }
        }
        .ok_or_else(|| DomainError::student_not_found(name))?;

        let deleted = repo
            .soft_delete(student.id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if !deleted {
            return Err(DomainError::student_not_found(name));
        }

        info!(id = student.id, "Soft-deleted student");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Vec-backed store standing in for SQLite.
    #[derive(Default)]
    struct FakeStore {
        rows: Arc<Mutex<Vec<Student>>>,
        offline: bool,
        failing_reads: bool,
    }

    struct FakeRepo {
        rows: Arc<Mutex<Vec<Student>>>,
        failing_reads: bool,
    }

    #[async_trait]
    impl StudentsStore for FakeStore {
        async fn connect(&self) -> anyhow::Result<Box<dyn StudentsRepository>> {
            if self.offline {
                anyhow::bail!("unable to open database file");
            }
            Ok(Box::new(FakeRepo {
                rows: self.rows.clone(),
                failing_reads: self.failing_reads,
            }))
        }
    }

    #[async_trait]
    impl StudentsRepository for FakeRepo {
        async fn find_first_by_name(&self, name: &str) -> anyhow::Result<Option<Student>> {
            if self.failing_reads {
                anyhow::bail!("no such column: students.name");
            }
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .find(|s| s.name == name && s.deleted_at.is_none())
                .cloned())
        }

        async fn insert(&self, new_student: NewStudent) -> anyhow::Result<Student> {
            let mut rows = self.rows.lock().unwrap();
            let now = Utc::now();
            let student = Student {
                id: rows.len() as i64 + 1,
                name: new_student.name,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            rows.push(student.clone());
            Ok(student)
        }

        async fn update_name(&self, id: i64, name: &str) -> anyhow::Result<Option<Student>> {
            let mut rows = self.rows.lock().unwrap();
            Ok(rows
                .iter_mut()
                .find(|s| s.id == id && s.deleted_at.is_none())
                .map(|s| {
                    s.name = name.to_owned();
                    s.updated_at = Utc::now();
                    s.clone()
                }))
        }

        async fn soft_delete(&self, id: i64) -> anyhow::Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            match rows
                .iter_mut()
                .find(|s| s.id == id && s.deleted_at.is_none())
            {
                Some(s) => {
                    s.deleted_at = Some(Utc::now());
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn service() -> Service {
        Service::new(Arc::new(FakeStore::default()))
    }

    fn new_student(name: &str) -> NewStudent {
        NewStudent { name: name.into() }
    }

    #[tokio::test]
    async fn lookup_returns_first_match() {
        let svc = service();
        let first = svc.create_student(new_student("Bob")).await.unwrap();
        svc.create_student(new_student("Bob")).await.unwrap();

        let found = svc.get_student("Bob").await.unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn lookup_is_case_sensitive() {
        let svc = service();
        svc.create_student(new_student("Ada")).await.unwrap();

        assert!(matches!(
            svc.get_student("ada").await,
            Err(DomainError::StudentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn empty_patch_keeps_record() {
        let svc = service();
        let created = svc.create_student(new_student("Ada")).await.unwrap();

        for patch in [
            StudentPatch::default(),
            StudentPatch {
                name: Some(String::new()),
            },
        ] {
            let same = svc.update_student(created.clone(), patch).await.unwrap();
            assert_eq!(same, created);
        }
        assert_eq!(svc.get_student("Ada").await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn update_of_deleted_record_is_not_found() {
        let svc = service();
        let created = svc.create_student(new_student("Ada")).await.unwrap();
        svc.delete_student("Ada").await.unwrap();

        let err = svc
            .update_student(
                created,
                StudentPatch {
                    name: Some("Grace".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::StudentNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let svc = service();
        svc.create_student(new_student("Ada")).await.unwrap();

        svc.delete_student("Ada").await.unwrap();
        assert!(matches!(
            svc.delete_student("Ada").await,
            Err(DomainError::StudentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn offline_store_is_storage_unavailable() {
        let svc = Service::new(Arc::new(FakeStore {
            offline: true,
            ..Default::default()
        }));

        let err = svc.get_student("Ada").await.unwrap_err();
        match err {
            DomainError::StorageUnavailable { message } => {
                assert!(message.contains("unable to open database file"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_lookup_before_delete_is_not_found_and_deletes_nothing() {
        let rows = Arc::new(Mutex::new(Vec::new()));
        service_over(rows.clone(), false)
            .create_student(new_student("Ada"))
            .await
            .unwrap();

        let err = service_over(rows.clone(), true)
            .delete_student("Ada")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::StudentNotFound { .. }));
        assert!(rows.lock().unwrap()[0].deleted_at.is_none());

        // The same lookup failure on GET surfaces as a database error.
        let err = service_over(rows, true).get_student("Ada").await.unwrap_err();
        assert!(matches!(err, DomainError::Database { .. }));
    }

    fn service_over(rows: Arc<Mutex<Vec<Student>>>, failing_reads: bool) -> Service {
        Service::new(Arc::new(FakeStore {
            rows,
            failing_reads,
            ..Default::default()
        }))
    }
}
