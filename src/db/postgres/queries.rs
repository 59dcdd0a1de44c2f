use sqlx::PgPool;

use crate::db::backend::DbResult;
use crate::errors::FailureInput;
use crate::models::student::{NewStudent, Student, StudentChanges, StudentRole};

const STUDENT_COLUMNS: &str = "id, name, email, role, created_at, updated_at";

/// Insert a student
pub async fn insert_student(pool: &PgPool, student: &NewStudent) -> DbResult<Student> {
    let sql = format!(
        "INSERT INTO students (name, email, role) VALUES ($1, $2, $3) RETURNING {}",
        STUDENT_COLUMNS
    );

    let row = sqlx::query_as::<_, Student>(&sql)
        .bind(&student.name)
        .bind(&student.email)
        .bind(student.role.as_str())
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// List students, optionally restricted to one role
pub async fn list_students(pool: &PgPool, role: Option<StudentRole>) -> DbResult<Vec<Student>> {
    let rows = match role {
        Some(role) => {
            let sql = format!(
                "SELECT {} FROM students WHERE role = $1 ORDER BY id",
                STUDENT_COLUMNS
            );
            sqlx::query_as::<_, Student>(&sql)
                .bind(role.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!("SELECT {} FROM students ORDER BY id", STUDENT_COLUMNS);
            sqlx::query_as::<_, Student>(&sql).fetch_all(pool).await?
        }
    };

    Ok(rows)
}

/// Get a student by ID
pub async fn get_student(pool: &PgPool, id: i32) -> DbResult<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE id = $1", STUDENT_COLUMNS);
    let row = sqlx::query_as::<_, Student>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Apply the present fields of `changes`; `updated_at` is bumped by trigger
pub async fn update_student(
    pool: &PgPool,
    id: i32,
    changes: &StudentChanges,
) -> DbResult<Student> {
    let sql = format!(
        r#"
        UPDATE students SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            role = COALESCE($4, role)
        WHERE id = $1
        RETURNING {}
        "#,
        STUDENT_COLUMNS
    );

    sqlx::query_as::<_, Student>(&sql)
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.role.map(|role| role.as_str()))
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| FailureInput::record_not_found("Student", id))
}

/// Delete a student, returning the removed row
pub async fn delete_student(pool: &PgPool, id: i32) -> DbResult<Student> {
    let sql = format!("DELETE FROM students WHERE id = $1 RETURNING {}", STUDENT_COLUMNS);

    sqlx::query_as::<_, Student>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| FailureInput::record_not_found("Student", id))
}
