// Library exports for Blogicum
// This allows integration tests and the admin CLI to use the same modules

pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod forms;
pub mod pagination;
pub mod routes;
pub mod state;
pub mod uploads;
pub mod visibility;
