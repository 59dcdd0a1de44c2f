use tracing::{debug, info};

use crate::db::{Database, DbResult};
use crate::errors::FailureInput;
use crate::models::student::{parse_role_filter, CreateStudent, Student, UpdateStudent};

/// Student use cases on top of the configured store
pub struct StudentsService {
    db: Database,
}

impl StudentsService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.db.kind()
    }

    pub async fn create(&self, input: CreateStudent) -> DbResult<Student> {
        let student = input.validate()?;
        let created = self.db.insert_student(&student).await?;
        info!(id = created.id, role = %created.role, "Created student");
        Ok(created)
    }

    pub async fn find_all(&self, role: Option<&str>) -> DbResult<Vec<Student>> {
        let role = parse_role_filter(role)?;
        let students = self.db.list_students(role).await?;
        debug!("Listed {} students (role filter: {:?})", students.len(), role);
        Ok(students)
    }

    pub async fn find_one(&self, id: i32) -> DbResult<Student> {
        self.db
            .get_student(id)
            .await?
            .ok_or_else(|| FailureInput::record_not_found("Student", id))
    }

    pub async fn update(&self, id: i32, input: UpdateStudent) -> DbResult<Student> {
        let changes = input.validate()?;
        let updated = self.db.update_student(id, &changes).await?;
        info!(id, "Updated student");
        Ok(updated)
    }

    pub async fn remove(&self, id: i32) -> DbResult<Student> {
        let removed = self.db.delete_student(id).await?;
        info!(id, "Deleted student");
        Ok(removed)
    }
}
