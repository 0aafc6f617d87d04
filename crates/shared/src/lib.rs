//! Shared types and configuration for pgshift.
//!
//! This crate provides common types used across all other crates:
//! - The `Version` newtype for migration versions
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
pub use types::{ParseVersionError, Version};
