//! API module
//!
//! This module provides the HTTP surface for the replan service.

pub mod server;

// Re-export commonly used types
pub use server::{router, serve, ApiResponse, AppState, ServerConfig};
