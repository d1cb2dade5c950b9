//! Module gateway and access control for the dashboard platform
//!
//! Fronts the file store, data-analysis, and report-generator modules with
//! a single entry point: capability checks per role, cached health state
//! with fail-fast forwarding, and a mirrored view of which files are ready
//! for analysis.

pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod presentation;

pub use app::{build_state, create_app, AppHandle};
pub use application::errors::GatewayError;
pub use config::Config;
