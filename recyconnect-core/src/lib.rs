//! recyconnect-core: domain rules and configuration
//!
//! Shared by the HTTP server and the CLI. No database or network code
//! lives here.

pub mod config;
pub mod domain;
pub mod error;

pub use config::AppConfig;
pub use error::{CoreError, Result};
