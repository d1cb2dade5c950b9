//! Presentation layer: HTTP surface, extractors, and API documentation

pub mod controllers;
pub mod extractors;
pub mod middleware;
pub mod models;
pub mod routes;
