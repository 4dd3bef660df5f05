//! HTTP handlers, grouped by resource.

pub mod health;
pub mod permissions;
pub mod users;
