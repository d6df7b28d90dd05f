pub mod dto;
pub mod model;
pub mod queries;
pub mod repository;
pub mod routes;
pub mod service;
pub mod validation;

pub use queries::PgTaskRepository;
pub use repository::{InMemoryTaskRepository, TaskRepository};
pub use service::TaskService;
