use chrono::{DateTime, Utc};

/// Pure student model for inter-module communication (no serde)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Always `None` for records returned by lookups; set once on soft delete.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Data for creating a new student
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewStudent {
    pub name: String,
}

/// Partial update data for a student. An absent or empty `name` leaves the record unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
}

impl StudentPatch {
    /// The new name, if the patch actually changes anything.
    pub fn effective_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}
