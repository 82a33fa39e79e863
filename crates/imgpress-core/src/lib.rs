//! Imgpress Core Library
//!
//! This crate provides the domain models, error types and configuration
//! shared by the conversion pipeline, the archive streamer and the HTTP API.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BatchPolicy, Config, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
