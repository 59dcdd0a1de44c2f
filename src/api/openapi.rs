use utoipa::OpenApi;

use crate::errors::ErrorEnvelope;
use crate::models::student::{CreateStudent, Student, StudentRole, UpdateStudent};
use crate::models::user::{CreateUserDto, UpdateUserDto, User, UserRole};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Student Registry",
        version = "0.1.0",
        description = "Student and user registry. Every failure is answered with the same JSON error envelope.",
        contact(
            name = "Student Registry API",
        )
    ),
    paths(
        crate::api::handlers::health,
        crate::api::handlers::create_student,
        crate::api::handlers::list_students,
        crate::api::handlers::get_student,
        crate::api::handlers::update_student,
        crate::api::handlers::delete_student,
        crate::api::handlers::create_user,
        crate::api::handlers::list_users,
        crate::api::handlers::get_user,
        crate::api::handlers::update_user,
        crate::api::handlers::delete_user,
    ),
    components(
        schemas(
            Student,
            StudentRole,
            CreateStudent,
            UpdateStudent,
            User,
            UserRole,
            CreateUserDto,
            UpdateUserDto,
            ErrorEnvelope,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "students", description = "Persisted student records"),
        (name = "users", description = "In-memory user records"),
    )
)]
pub struct ApiDoc;
