pub mod connection;
pub mod queries;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::backend::{DatabaseBackend, DbResult};
use crate::models::student::{NewStudent, Student, StudentChanges, StudentRole};

pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
    async fn insert_student(&self, student: &NewStudent) -> DbResult<Student> {
        queries::insert_student(&self.pool, student).await
    }

    async fn list_students(&self, role: Option<StudentRole>) -> DbResult<Vec<Student>> {
        queries::list_students(&self.pool, role).await
    }

    async fn get_student(&self, id: i32) -> DbResult<Option<Student>> {
        queries::get_student(&self.pool, id).await
    }

    async fn update_student(&self, id: i32, changes: &StudentChanges) -> DbResult<Student> {
        queries::update_student(&self.pool, id, changes).await
    }

    async fn delete_student(&self, id: i32) -> DbResult<Student> {
        queries::delete_student(&self.pool, id).await
    }

    async fn test_connection(&self) -> Result<()> {
        connection::test_connection(&self.pool).await
    }

    fn kind(&self) -> &'static str {
        "postgresql"
    }
}
