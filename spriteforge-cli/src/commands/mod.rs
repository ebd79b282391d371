//! CLI command implementations.

pub mod common;
pub mod convert;
pub mod upload;
