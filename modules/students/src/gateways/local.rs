use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::StudentsApi,
    error::StudentsError,
    model::{NewStudent, Student, StudentPatch},
};
use crate::domain::{error::DomainError, service::Service};

/// Local implementation of the StudentsApi trait that delegates to the domain service
pub struct StudentsLocalClient {
    service: Arc<Service>,
}

impl StudentsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl StudentsApi for StudentsLocalClient {
    async fn get_student(&self, name: &str) -> anyhow::Result<Student> {
        self.service
            .get_student(name)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn create_student(&self, new_student: NewStudent) -> anyhow::Result<Student> {
        self.service
            .create_student(new_student)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn update_student(&self, name: &str, patch: StudentPatch) -> anyhow::Result<Student> {
        let current = self
            .service
            .get_student(name)
            .await
            .map_err(map_domain_error_to_anyhow)?;
        self.service
            .update_student(current, patch)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn delete_student(&self, name: &str) -> anyhow::Result<()> {
        self.service
            .delete_student(name)
            .await
            .map_err(map_domain_error_to_anyhow)
    }
}

/// Map domain errors to contract errors wrapped in anyhow
fn map_domain_error_to_anyhow(domain_error: DomainError) -> anyhow::Error {
    let contract_error = match domain_error {
        DomainError::StudentNotFound { name } => StudentsError::not_found(name),
        DomainError::StorageUnavailable { message } => StudentsError::unavailable(message),
        DomainError::Database { .. } => StudentsError::internal(),
    };

    anyhow::Error::new(contract_error)
}
