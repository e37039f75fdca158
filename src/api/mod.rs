//! API Module
//!
//! HTTP handlers and routing for the cache and premium REST API.
//!
//! # Endpoints
//! - `/health` - Health check endpoint
//! - `/cache/*` - Expiring key-value cache
//! - `/premium/*` - Card validation, VPN screening and subscriptions

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
