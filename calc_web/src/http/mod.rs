//! HTTP layer.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  handlers (JSON API)   docs (HTML browser)    │
//! └───────────────────┬──────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────┐
//! │  calc_core::Registry                          │
//! │  - documentation lookups                      │
//! │  - dependency resolution + load (blocking)    │
//! └──────────────────────────────────────────────┘
//! ```

pub mod docs;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
