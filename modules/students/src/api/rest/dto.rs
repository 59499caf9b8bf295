use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contract::model::{NewStudent, Student, StudentPatch};

/// REST DTO for student representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentDto {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// REST DTO for creating a new student. Unknown fields are ignored, a missing or null name binds to "".
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateStudentReq {
    #[serde(default)]
    pub name: Option<String>,
}

/// REST DTO for updating a student (partial)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateStudentReq {
    #[serde(default)]
    pub name: Option<String>,
}

/// REST DTO for the delete acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub message: String,
}

impl From<Student> for StudentDto {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            created_at: student.created_at,
            updated_at: student.updated_at,
        }
    }
}

impl From<CreateStudentReq> for NewStudent {
    fn from(req: CreateStudentReq) -> Self {
        Self {
            name: req.name.unwrap_or_default(),
        }
    }
}

impl From<UpdateStudentReq> for StudentPatch {
    fn from(req: UpdateStudentReq) -> Self {
        Self { name: req.name }
    }
}
