//! Shared wire definitions for the Taskboard API and live update channel.

pub mod ack;
pub mod event;
pub mod id;
pub mod message;
pub mod reorder;
