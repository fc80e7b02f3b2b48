//! # Tasklog API Server Library
//!
//! HTTP surface of the task logging service: authentication, task and
//! comment CRUD, templates, analytics and the admin console API.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `bootstrap`: Administrator provisioning on startup
//! - `config`: Configuration from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Page gate and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
