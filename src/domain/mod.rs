//! Core domain models: modules, permissions, file descriptors

pub mod files;
pub mod module;
pub mod permissions;
