//! Batch extraction and reconciliation pipeline for GPS-fleet service
//! histories: free-text maintenance descriptions go through a
//! text-generation service under a strict structural contract, come back as
//! normalized component/action events, and replay into a per-device
//! installed-component snapshot.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod ingest;
pub mod pipeline;
pub mod services;
pub mod vocabulary;

pub use error::AppError;
