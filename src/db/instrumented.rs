use anyhow::Result;
use async_trait::async_trait;
use std::time::Instant;

use crate::db::backend::DbResult;
use crate::db::{Database, DatabaseBackend};
use crate::metrics::registry::{DATABASE_QUERIES_TOTAL, DATABASE_QUERY_DURATION_SECONDS};
use crate::models::student::{NewStudent, Student, StudentChanges, StudentRole};

/// Wraps a backend and records query counts and durations
pub struct InstrumentedDatabase {
    inner: Database,
}

impl InstrumentedDatabase {
    pub fn new(inner: Database) -> Self {
        Self { inner }
    }

    fn observe<T>(&self, query_type: &'static str, start: Instant, res: &DbResult<T>) {
        let outcome = if res.is_ok() { "ok" } else { "error" };
        DATABASE_QUERIES_TOTAL
            .with_label_values(&[query_type, outcome])
            .inc();
        DATABASE_QUERY_DURATION_SECONDS
            .with_label_values(&[query_type])
            .observe(start.elapsed().as_secs_f64());
    }
}

#[async_trait]
impl DatabaseBackend for InstrumentedDatabase {
    async fn insert_student(&self, student: &NewStudent) -> DbResult<Student> {
        let start = Instant::now();
        let res = self.inner.insert_student(student).await;
        self.observe("insert", start, &res);
        res
    }

    async fn list_students(&self, role: Option<StudentRole>) -> DbResult<Vec<Student>> {
        let start = Instant::now();
        let res = self.inner.list_students(role).await;
        self.observe("select", start, &res);
        res
    }

    async fn get_student(&self, id: i32) -> DbResult<Option<Student>> {
        let start = Instant::now();
        let res = self.inner.get_student(id).await;
        self.observe("select", start, &res);
        res
    }

    async fn update_student(&self, id: i32, changes: &StudentChanges) -> DbResult<Student> {
        let start = Instant::now();
        let res = self.inner.update_student(id, changes).await;
        self.observe("update", start, &res);
        res
    }

    async fn delete_student(&self, id: i32) -> DbResult<Student> {
        let start = Instant::now();
        let res = self.inner.delete_student(id).await;
        self.observe("delete", start, &res);
        res
    }

    async fn test_connection(&self) -> Result<()> {
        self.inner.test_connection().await
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }
}
