//! Taskboard server library.
//!
//! Exposes the services and HTTP surface for use in tests and embedding.
//! The server persists tasks and users in a document store and pushes a
//! `tasksUpdated` hint to every connected WebSocket observer after each
//! successful task mutation.

pub mod config;
pub mod error;
pub mod notify;
pub mod server;
pub mod store;
pub mod tasks;
pub mod users;
