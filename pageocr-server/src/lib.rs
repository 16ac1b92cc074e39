//! PageOCR Server Library - HTTP API for page images and OCR transcripts
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod validation;

pub use auth::{AccessGate, AUTH_HEADER};
pub use config::Config;
pub use error::ApiError;
pub use openapi::ApiDoc;
pub use routes::{build_state, create_router, create_router_with_state};
pub use state::{AppState, EngineProbe};
