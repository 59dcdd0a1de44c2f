use tokio::sync::RwLock;
use tracing::info;

use crate::errors::FailureInput;
use crate::models::user::{CreateUserDto, UpdateUserDto, User, UserRole};

/// Users kept in process memory; lost on restart
#[derive(Default)]
pub struct UsersService {
    state: RwLock<UsersState>,
}

#[derive(Default)]
struct UsersState {
    users: Vec<User>,
    last_id: u32,
}

fn user_not_found() -> FailureInput {
    FailureInput::not_found("User Not Found")
}

impl UsersService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, dto: CreateUserDto) -> Result<User, FailureInput> {
        let new_user = dto.validate()?;
        let mut state = self.state.write().await;

        state.last_id += 1;
        let user = User {
            id: state.last_id,
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
        };
        state.users.push(user.clone());

        info!(id = user.id, "Created user");
        Ok(user)
    }

    /// All users, or those with `role`; a role nobody has is a 404
    pub async fn find_all(&self, role: Option<&str>) -> Result<Vec<User>, FailureInput> {
        let state = self.state.read().await;
        let Some(role) = role else {
            return Ok(state.users.clone());
        };

        let matching: Vec<User> = match role.parse::<UserRole>() {
            Ok(role) => state
                .users
                .iter()
                .filter(|u| u.role == role)
                .cloned()
                .collect(),
            Err(()) => Vec::new(),
        };

        if matching.is_empty() {
            return Err(FailureInput::not_found("User Role Not Found"));
        }
        Ok(matching)
    }

    pub async fn find_one(&self, id: u32) -> Result<User, FailureInput> {
        self.state
            .read()
            .await
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(user_not_found)
    }

    pub async fn update(&self, id: u32, dto: UpdateUserDto) -> Result<User, FailureInput> {
        let changes = dto.validate()?;
        let mut state = self.state.write().await;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(user_not_found)?;

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }

        Ok(user.clone())
    }

    pub async fn remove(&self, id: u32) -> Result<User, FailureInput> {
        let mut state = self.state.write().await;
        let index = state
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(user_not_found)?;

        Ok(state.users.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grace() -> CreateUserDto {
        CreateUserDto {
            name: Some("Grace".to_string()),
            email: Some("grace@example.com".to_string()),
            role: Some("ENGINEER".to_string()),
        }
    }

    #[tokio::test]
    async fn test_crud_cycle() {
        let service = UsersService::new();
        let created = service.create(grace()).await.unwrap();
        assert_eq!(created.id, 1);

        let updated = service
            .update(
                created.id,
                UpdateUserDto {
                    role: Some("ADMIN".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, UserRole::Admin);

        let removed = service.remove(created.id).await.unwrap();
        assert_eq!(removed.name, "Grace");
        assert!(service.find_one(created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_role_filter_without_matches_is_404() {
        let service = UsersService::new();
        service.create(grace()).await.unwrap();

        assert_eq!(service.find_all(Some("ENGINEER")).await.unwrap().len(), 1);
        assert_eq!(
            service.find_all(Some("INTERN")).await.unwrap_err(),
            FailureInput::not_found("User Role Not Found")
        );
        assert!(service.find_all(Some("JANITOR")).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_user() {
        let service = UsersService::new();
        let err = service.find_one(7).await.unwrap_err();
        assert_eq!(err, FailureInput::not_found("User Not Found"));
    }
}
