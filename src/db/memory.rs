use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::db::backend::{DatabaseBackend, DbResult};
use crate::errors::FailureInput;
use crate::models::student::{NewStudent, Student, StudentChanges, StudentRole};

/// SQLSTATE PostgreSQL reports for a unique constraint violation
const UNIQUE_VIOLATION: &str = "23505";

/// Process-local student store with the same constraints as the SQL schema
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    students: BTreeMap<i32, Student>,
    last_id: i32,
}

impl MemoryState {
    fn ensure_unique_email(&self, email: &str, except: Option<i32>) -> DbResult<()> {
        let taken = self
            .students
            .values()
            .any(|s| s.email == email && Some(s.id) != except);

        if taken {
            return Err(FailureInput::request(
                UNIQUE_VIOLATION,
                "duplicate key value violates unique constraint \"students_email_key\"",
            ));
        }
        Ok(())
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseBackend for MemoryBackend {
    async fn insert_student(&self, student: &NewStudent) -> DbResult<Student> {
        let mut state = self.state.write().await;
        state.ensure_unique_email(&student.email, None)?;

        state.last_id += 1;
        let now = Utc::now();
        let row = Student {
            id: state.last_id,
            name: student.name.clone(),
            email: student.email.clone(),
            role: student.role,
            created_at: now,
            updated_at: now,
        };
        state.students.insert(row.id, row.clone());

        Ok(row)
    }

    async fn list_students(&self, role: Option<StudentRole>) -> DbResult<Vec<Student>> {
        let state = self.state.read().await;
        Ok(state
            .students
            .values()
            .filter(|s| role.map_or(true, |role| s.role == role))
            .cloned()
            .collect())
    }

    async fn get_student(&self, id: i32) -> DbResult<Option<Student>> {
        Ok(self.state.read().await.students.get(&id).cloned())
    }

    async fn update_student(&self, id: i32, changes: &StudentChanges) -> DbResult<Student> {
        let mut state = self.state.write().await;
        if !state.students.contains_key(&id) {
            return Err(FailureInput::record_not_found("Student", id));
        }
        if let Some(email) = &changes.email {
            state.ensure_unique_email(email, Some(id))?;
        }

        let row = state
            .students
            .get_mut(&id)
            .ok_or_else(|| FailureInput::record_not_found("Student", id))?;
        if let Some(name) = &changes.name {
            row.name = name.clone();
        }
        if let Some(email) = &changes.email {
            row.email = email.clone();
        }
        if let Some(role) = changes.role {
            row.role = role;
        }
        row.updated_at = Utc::now();

        Ok(row.clone())
    }

    async fn delete_student(&self, id: i32) -> DbResult<Student> {
        self.state
            .write()
            .await
            .students
            .remove(&id)
            .ok_or_else(|| FailureInput::record_not_found("Student", id))
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
