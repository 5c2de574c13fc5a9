//! # examhub-core
//!
//! Core crate for the ExamHub console client. Contains configuration
//! schemas, typed identifiers, and the unified error system shared by
//! the notification subsystem crates.
//!
//! This crate has **no** internal dependencies on other ExamHub crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
