//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod health;
pub mod page;

pub use crate::state::AppState;
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use page::{
    delete_page, get_page, put_page, CreatedResponse, DeletedResponse, RepresentationsResponse,
    CACHE_HEADER, GENERATION_MS_HEADER,
};
