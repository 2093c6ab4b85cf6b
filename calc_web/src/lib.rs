//! # calc_web - HTTP Front-end
//!
//! Serves the calculator registry over HTTP:
//!
//! - a JSON API (`/health`, `/calculators`, `/calculate`)
//! - an HTML documentation browser (`/docs`) with a generated input form per
//!   calculator
//!
//! Both share one [`AppState`] holding the registry.

pub mod http;

pub use http::{create_router, AppState};
