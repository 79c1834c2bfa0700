//! recyconnect-server: REST backend for the campus item exchange
//!
//! Marketplace listings, donations, lost-and-found reports, concerns,
//! messages and moderation flags over Postgres, with live dashboard
//! updates streamed as Server-Sent Events.

pub mod db;
pub mod http;
pub mod models;
pub mod realtime;
pub mod uploads;

pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
pub use realtime::{Broadcaster, EventKind, RealtimeEvent};
pub use uploads::ImageStore;
