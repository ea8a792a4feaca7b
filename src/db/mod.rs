//! Database module for the task manager server
//!
//! Owns the refresh session registry and the narrow read/purge views
//! this service needs onto the user and task tables.

pub mod models;
pub mod operations;
pub mod registry;
pub mod store;

pub use models::{Session, User};
pub use operations::DbOperations;
pub use registry::{InMemorySessionRegistry, SessionRegistry};
pub use store::{TaskStore, UserStore};
