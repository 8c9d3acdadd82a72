//! Local HTTP control API for the dashboard
//!
//! - POST /calls/start - Start a call for a business profile
//! - POST /calls/stop/:id - Stop a call
//! - GET /calls/:id/status - Call statistics
//! - GET /calls/:id/transcript - Reconciled transcript so far
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::{allow_origins, create_router};
pub use state::{AppState, LogListener};
