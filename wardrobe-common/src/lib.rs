//! # Wardrobe Common Library
//!
//! Shared code for the wardrobe services including:
//! - Item record and tag choice definitions
//! - Configuration loading and root folder resolution
//! - Common error type

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::ItemRecord;
