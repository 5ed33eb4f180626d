pub mod auth;
pub mod dto;
pub mod error;
mod handlers;
pub mod problem;
pub mod routes;

pub use problem::Problem;
pub use routes::router;
