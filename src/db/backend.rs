use anyhow::Result;
use async_trait::async_trait;

use crate::errors::FailureInput;
use crate::models::student::{NewStudent, Student, StudentChanges, StudentRole};

/// Outcome of a data operation; failures are already classified
pub type DbResult<T> = std::result::Result<T, FailureInput>;

/// Store for students, implemented by PostgreSQL and in-memory backends
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Insert a student and return the stored row
    async fn insert_student(&self, student: &NewStudent) -> DbResult<Student>;

    /// List students ordered by id, optionally filtered by role
    async fn list_students(&self, role: Option<StudentRole>) -> DbResult<Vec<Student>>;

    /// Get a student by ID
    async fn get_student(&self, id: i32) -> DbResult<Option<Student>>;

    /// Apply a partial update; fails with `NOT_FOUND` when the row is missing
    async fn update_student(&self, id: i32, changes: &StudentChanges) -> DbResult<Student>;

    /// Delete a student and return the removed row; fails with `NOT_FOUND`
    /// when the row is missing
    async fn delete_student(&self, id: i32) -> DbResult<Student>;

    /// Test database connection
    async fn test_connection(&self) -> Result<()>;

    /// Backend name for logs and health output
    fn kind(&self) -> &'static str;
}
