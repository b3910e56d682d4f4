//! HTTP intake surface for the notification delivery pipeline.
//!
//! Exposes notification send/schedule/status/batch endpoints, template
//! CRUD, an analytics summary, and merges in the health endpoints so the
//! whole surface is served from one router and one listener.

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{router, serve};
pub use state::AppState;
