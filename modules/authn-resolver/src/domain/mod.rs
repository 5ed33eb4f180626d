pub mod bearer;
pub mod directory;
pub mod error;
pub mod service;
