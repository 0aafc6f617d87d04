//! Common types used across the workspace.

pub mod version;

pub use version::{ParseVersionError, Version};
