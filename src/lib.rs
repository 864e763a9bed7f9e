// Pagesite - a minimal content-managed website

// Core types and primitives
pub mod core;

// Page entity, write inputs and SEO metadata
pub mod models;

// Pre-commit page hooks (homepage invariant, defaults, validation)
pub mod hooks;

// Persistence - repository trait and SQLite implementation
pub mod infrastructure;

// Request-level services and views
pub mod services;
pub mod views;

// HTTP surface
pub mod http;

// Common utilities
pub mod app_state;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
