pub mod students;
pub mod users;

pub use students::StudentsService;
pub use users::UsersService;
