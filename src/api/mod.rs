//! API module for the HTTP/JSON entry surface
//!
//! This module provides the REST endpoints used by the stock entry UI.

pub mod http;
pub mod rest;
pub mod state;

pub use http::{create_router, serve};
pub use state::AppState;
