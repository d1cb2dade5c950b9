//! Application services: the gateway pipeline, audit trail, and error taxonomy

pub mod audit;
pub mod errors;
pub mod router;
