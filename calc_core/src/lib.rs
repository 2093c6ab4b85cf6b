//! # calc_core - Clinical Calculator Engine
//!
//! `calc_core` holds the clinical calculators and everything needed to
//! discover, document and load them. All inputs and outputs are JSON, so the
//! same calls back the web API, the documentation browser and the CLI.
//!
//! ## Design Philosophy
//!
//! - **Self-describing**: each calculator ships a documentation block that
//!   declares its inputs and third-party requirements
//! - **Lazy**: documentation is read without instantiating anything; a
//!   calculator is built only after its requirements are installed
//! - **Rich Errors**: structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use calc_core::{Registry, Settings};
//! use serde_json::json;
//!
//! let registry = Registry::builtin(&Settings::default());
//!
//! for (name, title) in registry.available() {
//!     println!("{}\t{}", name, title);
//! }
//!
//! let resp = registry
//!     .calculate("dcct_ifcc", &json!({ "value": 7.0, "input_unit": "dcct" }))
//!     .unwrap();
//! println!("{}", serde_json::to_string_pretty(&resp).unwrap());
//! ```
//!
//! ## Modules
//!
//! - [`registry`] - Name to calculator mapping and the two-phase load
//! - [`calculators`] - The [`Calculator`] trait and built-in calculators
//! - [`spec`] - Documentation block parsing (`[inputs]`, `[dependencies]`)
//! - [`namespace`] - Where documentation sources are read from
//! - [`deps`] - Probing for and installing declared requirements
//! - [`response`] - The uniform calculation response envelope
//! - [`config`] - Settings file and environment overrides
//! - [`errors`] - Structured error types

pub mod calculators;
pub mod config;
pub mod deps;
pub mod errors;
pub mod namespace;
pub mod registry;
pub mod response;
pub mod spec;

// Re-export commonly used types at crate root for convenience
pub use calculators::Calculator;
pub use config::Settings;
pub use errors::{CalcError, CalcResult};
pub use registry::Registry;
pub use response::{CalculationResponse, Metadata};
pub use spec::{CalculatorSpec, FieldType, InputField};
