//! HTTP server layer for the tile proxy.
//!
//! This module exposes the heatmap tiles over plain, unauthenticated HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        GET /personal/{..}/{z}/{x}/{y}   GET /global/...         │
//! │                                                                 │
//! │  ┌──────────────────────────────┐  ┌─────────────────────────┐  │
//! │  │          handlers            │  │        routes           │  │
//! │  │ (parse, proxy, error JSON)   │  │  (router, CORS, trace)  │  │
//! │  └──────────────────────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    global_tile_handler, health_handler, personal_tile_handler, AppState, ErrorResponse,
    HandlerError, HealthResponse,
};
pub use routes::{create_router, RouterConfig};
