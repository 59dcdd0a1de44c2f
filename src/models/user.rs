use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use utoipa::ToSchema;

use super::looks_like_email;
use crate::errors::FailureInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Intern,
    Engineer,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [Self::Intern, Self::Engineer, Self::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intern => "INTERN",
            Self::Engineer => "ENGINEER",
            Self::Admin => "ADMIN",
        }
    }
}

impl FromStr for UserRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|role| role.as_str() == s).ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

/// Body of `POST /users`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateUserDto {
    pub name: Option<String>,
    pub email: Option<String>,
    /// One of INTERN, ENGINEER, ADMIN
    pub role: Option<String>,
}

/// Body of `PATCH /users/{id}`; every field is optional
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

/// Collects every constraint violation before failing, like a DTO validator
#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn name(&mut self, value: Option<&str>, required: bool) -> Option<String> {
        match value {
            None if required => {
                self.0.push("name must be a string".to_string());
                self.0.push("name should not be empty".to_string());
                None
            }
            None => None,
            Some(name) if name.trim().is_empty() => {
                self.0.push("name should not be empty".to_string());
                None
            }
            Some(name) => Some(name.trim().to_string()),
        }
    }

    fn email(&mut self, value: Option<&str>, required: bool) -> Option<String> {
        match value {
            None if !required => None,
            Some(email) if looks_like_email(email.trim()) => Some(email.trim().to_string()),
            _ => {
                self.0.push("email must be an email".to_string());
                None
            }
        }
    }

    fn role(&mut self, value: Option<&str>, required: bool) -> Option<UserRole> {
        match value {
            None if !required => None,
            Some(role) if role.parse::<UserRole>().is_ok() => role.parse().ok(),
            _ => {
                self.0.push(
                    "Valid role required: role must be one of the following values: INTERN, ENGINEER, ADMIN"
                        .to_string(),
                );
                None
            }
        }
    }

    fn into_failure(self) -> Option<FailureInput> {
        if self.0.is_empty() {
            None
        } else {
            Some(FailureInput::bad_request(json!(self.0)))
        }
    }
}

impl CreateUserDto {
    pub fn validate(self) -> Result<NewUser, FailureInput> {
        let mut violations = Violations::default();
        let name = violations.name(self.name.as_deref(), true);
        let email = violations.email(self.email.as_deref(), true);
        let role = violations.role(self.role.as_deref(), true);

        if let Some(failure) = violations.into_failure() {
            return Err(failure);
        }

        match (name, email, role) {
            (Some(name), Some(email), Some(role)) => Ok(NewUser { name, email, role }),
            _ => Err(FailureInput::bad_request("Invalid user")),
        }
    }
}

impl UpdateUserDto {
    pub fn validate(self) -> Result<UserChanges, FailureInput> {
        let mut violations = Violations::default();
        let changes = UserChanges {
            name: violations.name(self.name.as_deref(), false),
            email: violations.email(self.email.as_deref(), false),
            role: violations.role(self.role.as_deref(), false),
        };

        match violations.into_failure() {
            Some(failure) => Err(failure),
            None => Ok(changes),
        }
    }
}
