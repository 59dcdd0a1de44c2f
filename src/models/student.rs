use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "postgres")]
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

use super::looks_like_email;
use crate::errors::FailureInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentRole {
    Intern,
    Student,
    Teacher,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown student role '{0}'")]
pub struct UnknownStudentRole(pub String);

impl StudentRole {
    pub const ALL: [StudentRole; 4] = [Self::Intern, Self::Student, Self::Teacher, Self::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intern => "INTERN",
            Self::Student => "STUDENT",
            Self::Teacher => "TEACHER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for StudentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentRole {
    type Err = UnknownStudentRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownStudentRole(s.to_string()))
    }
}

impl TryFrom<String> for StudentRole {
    type Error = UnknownStudentRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A persisted student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[cfg_attr(feature = "postgres", sqlx(try_from = "String"))]
    pub role: StudentRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /students`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateStudent {
    pub name: Option<String>,
    pub email: Option<String>,
    /// One of INTERN, STUDENT, TEACHER, ADMIN
    pub role: Option<String>,
}

/// Body of `PATCH /students/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateStudent {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Checked input for an insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub role: StudentRole,
}

/// Checked input for a partial update; `None` leaves the column alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<StudentRole>,
}

impl CreateStudent {
    pub fn validate(self) -> Result<NewStudent, FailureInput> {
        let invalid = |detail: String| invalid_invocation("create", &self, detail);

        let name = match self.name.as_deref() {
            None => return Err(invalid("Argument `name` is missing.".to_string())),
            Some(name) => check_name(name).map_err(invalid)?,
        };
        let email = match self.email.as_deref() {
            None => return Err(invalid("Argument `email` is missing.".to_string())),
            Some(email) => check_email(email).map_err(invalid)?,
        };
        let role = match self.role.as_deref() {
            None => return Err(invalid("Argument `role` is missing.".to_string())),
            Some(role) => check_role(role).map_err(invalid)?,
        };

        Ok(NewStudent { name, email, role })
    }
}

impl UpdateStudent {
    pub fn validate(self) -> Result<StudentChanges, FailureInput> {
        let invalid = |detail: String| invalid_invocation("update", &self, detail);

        Ok(StudentChanges {
            name: self
                .name
                .as_deref()
                .map(check_name)
                .transpose()
                .map_err(invalid)?,
            email: self
                .email
                .as_deref()
                .map(check_email)
                .transpose()
                .map_err(invalid)?,
            role: self
                .role
                .as_deref()
                .map(check_role)
                .transpose()
                .map_err(invalid)?,
        })
    }
}

/// Parse the `role` query filter; `ALL` and absent both mean no filter
pub fn parse_role_filter(raw: Option<&str>) -> Result<Option<StudentRole>, FailureInput> {
    match raw {
        None | Some("ALL") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            FailureInput::validation(format!(
                "Invalid `students.findMany()` invocation:\n\n{{ where: {{ role: \"{}\" }} }}\n\n{}",
                value,
                role_detail(value)
            ))
        }),
    }
}

fn check_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Argument `name` must not be empty.".to_string());
    }
    Ok(trimmed.to_string())
}

fn check_email(email: &str) -> Result<String, String> {
    let trimmed = email.trim();
    if !looks_like_email(trimmed) {
        return Err(format!(
            "Argument `email`: Invalid value provided. Expected an email address, provided `{}`.",
            email
        ));
    }
    Ok(trimmed.to_lowercase())
}

fn check_role(role: &str) -> Result<StudentRole, String> {
    role.parse().map_err(|_| role_detail(role))
}

fn role_detail(role: &str) -> String {
    format!(
        "Argument `role`: Invalid value provided. Expected StudentRole, provided `{}`.",
        role
    )
}

/// Multi-line store-style message; the last line is the one clients see
fn invalid_invocation<T: Serialize>(operation: &str, args: &T, detail: String) -> FailureInput {
    let args = serde_json::to_string_pretty(args).unwrap_or_default();
    FailureInput::validation(format!(
        "Invalid `students.{}()` invocation:\n\n{}\n\n{}",
        operation, args, detail
    ))
}
