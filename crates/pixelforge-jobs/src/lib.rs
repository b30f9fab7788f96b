//! Conversion job lifecycle for the PixelForge client.
//!
//! This crate provides:
//! - Listing, creation, status and download endpoints for conversion jobs
//! - Process-local blob handles for downloaded bytes
//! - Save targets for artifacts

mod blob;
mod client;
mod error;
mod types;
mod util;

pub use blob::{BlobRegistry, BlobUrl, DirectorySaveTarget, SaveTarget};
pub use client::JobClient;
pub use error::{JobError, JobResult};
pub use types::{
    is_terminal_status, Job, JobDownload, JobStatusReport, JobUpload, PaginatedResponse,
    UploadFile,
};
pub use util::{bytes_to_mb, image_extension};
