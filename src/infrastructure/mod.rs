//! Infrastructure layer module
//!
//! Configuration loading, logging, and process assembly.

pub mod config;
pub mod logging;
pub mod setup;
