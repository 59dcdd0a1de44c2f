use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use utoipa::IntoParams;

use super::extract::{ApiJson, ApiPath, ApiQuery, ClientIp};
use crate::config::Config;
use crate::db::Database;
use crate::errors::{ErrorEnvelope, ErrorNormalizer, FailureInput};
use crate::logger::{Logger, ScopedLogger};
use crate::models::student::{CreateStudent, Student, UpdateStudent};
use crate::models::user::{CreateUserDto, UpdateUserDto, User};
use crate::services::{StudentsService, UsersService};
use crate::throttle::Throttler;

lazy_static::lazy_static! {
    static ref START_TIME: Instant = Instant::now();
}

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub students: StudentsService,
    pub users: UsersService,
    pub normalizer: Arc<ErrorNormalizer>,
    /// Tiers applied to every throttled route
    pub global_throttler: Arc<Throttler>,
    /// Stricter limit for single-student lookups
    pub lookup_throttler: Arc<Throttler>,
    pub api_prefix: String,
    students_log: ScopedLogger,
}

impl AppStateInner {
    pub fn new(db: Database, logger: &Logger, config: &Config) -> Result<Self> {
        let normalizer = ErrorNormalizer::new(logger)
            .with_compat_response(config.errors.compat_response);

        Ok(Self {
            students: StudentsService::new(db),
            users: UsersService::new(),
            normalizer: Arc::new(normalizer),
            global_throttler: Arc::new(Throttler::new(&config.throttle.global)?),
            lookup_throttler: Arc::new(Throttler::new(std::slice::from_ref(
                &config.throttle.student_lookup,
            ))?),
            api_prefix: config.server.api_prefix.clone(),
            students_log: logger.scoped("StudentsController"),
        })
    }
}

/// Student list filter
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentListParams {
    /// INTERN, STUDENT, TEACHER, ADMIN or ALL
    pub role: Option<String>,
}

/// User list filter
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListParams {
    /// INTERN, ENGINEER or ADMIN
    pub role: Option<String>,
}

pub async fn hello() -> &'static str {
    "Hello World!"
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = serde_json::Value)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "student-registry",
        "version": env!("CARGO_PKG_VERSION"),
        "database": state.students.backend_kind(),
        "uptime_seconds": START_TIME.elapsed().as_secs(),
    }))
}

/// Create a student
#[utoipa::path(
    post,
    path = "/api/students",
    tag = "students",
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Invalid input or duplicate email", body = ErrorEnvelope)
    )
)]
pub async fn create_student(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateStudent>,
) -> Result<impl IntoResponse, FailureInput> {
    let student = state.students.create(input).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// List students, optionally by role
#[utoipa::path(
    get,
    path = "/api/students",
    tag = "students",
    params(StudentListParams),
    responses(
        (status = 200, description = "Matching students", body = [Student]),
        (status = 400, description = "Unknown role", body = ErrorEnvelope)
    )
)]
pub async fn list_students(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiQuery(params): ApiQuery<StudentListParams>,
) -> Result<Json<Vec<Student>>, FailureInput> {
    state.students_log.log(format!(
        "Received request from IP: {} with role filter: {}",
        ip,
        params.role.as_deref().unwrap_or("none")
    ));

    let students = state.students.find_all(params.role.as_deref()).await?;
    Ok(Json(students))
}

/// Get a student by id (1 request per second per client)
#[utoipa::path(
    get,
    path = "/api/students/{id}",
    tag = "students",
    params(("id" = i32, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 400, description = "No student with this id", body = ErrorEnvelope),
        (status = 429, description = "Too many requests", body = ErrorEnvelope)
    )
)]
pub async fn get_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<Student>, FailureInput> {
    Ok(Json(state.students.find_one(id).await?))
}

/// Update a student
#[utoipa::path(
    patch,
    path = "/api/students/{id}",
    tag = "students",
    params(("id" = i32, Path, description = "Student id")),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Invalid input or no student with this id", body = ErrorEnvelope)
    )
)]
pub async fn update_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<UpdateStudent>,
) -> Result<Json<Student>, FailureInput> {
    Ok(Json(state.students.update(id, input).await?))
}

/// Delete a student
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    tag = "students",
    params(("id" = i32, Path, description = "Student id")),
    responses(
        (status = 200, description = "Deleted student", body = Student),
        (status = 400, description = "No student with this id", body = ErrorEnvelope)
    )
)]
pub async fn delete_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<Student>, FailureInput> {
    Ok(Json(state.students.remove(id).await?))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Validation messages", body = ErrorEnvelope)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(dto): ApiJson<CreateUserDto>,
) -> Result<impl IntoResponse, FailureInput> {
    let user = state.users.create(dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List users, optionally by role
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(UserListParams),
    responses(
        (status = 200, description = "Matching users", body = [User]),
        (status = 404, description = "No user has this role", body = ErrorEnvelope)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<UserListParams>,
) -> Result<Json<Vec<User>>, FailureInput> {
    Ok(Json(state.users.find_all(params.role.as_deref()).await?))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = u32, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found", body = ErrorEnvelope)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u32>,
) -> Result<Json<User>, FailureInput> {
    Ok(Json(state.users.find_one(id).await?))
}

/// Update a user
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = u32, Path, description = "User id")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Validation messages", body = ErrorEnvelope),
        (status = 404, description = "User not found", body = ErrorEnvelope)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u32>,
    ApiJson(dto): ApiJson<UpdateUserDto>,
) -> Result<Json<User>, FailureInput> {
    Ok(Json(state.users.update(id, dto).await?))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = u32, Path, description = "User id")),
    responses(
        (status = 200, description = "Deleted user", body = User),
        (status = 404, description = "User not found", body = ErrorEnvelope)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u32>,
) -> Result<Json<User>, FailureInput> {
    Ok(Json(state.users.remove(id).await?))
}
