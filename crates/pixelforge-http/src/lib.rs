//! HTTP transport for the PixelForge API.
//!
//! This crate provides:
//! - A single shared client decorating every request with the bearer token
//! - Centralized 401 handling: token teardown plus an unauthorized broadcast
//! - Environment-driven client configuration
//! - The error taxonomy shared by the session and job clients

mod client;
mod config;
mod error;
mod signal;

pub use client::HttpClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ApiError, ApiResult, ErrorKind};
pub use signal::{Unauthorized, UnauthorizedSignal};

pub use reqwest::multipart;
pub use reqwest::Method;
