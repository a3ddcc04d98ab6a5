//! REST API for CarePortal
//!
//! Handlers stay thin: extract, call the clinic service, serialize.

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::configure;
