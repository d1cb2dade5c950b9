//! Infrastructure: shared stores and HTTP transports

pub mod forwarder;
pub mod health;
pub mod readiness;
pub mod registry;
