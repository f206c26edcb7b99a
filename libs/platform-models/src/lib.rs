//! Platform API models
//!
//! Records and payloads exchanged with the DevOps platform REST API.

pub mod models;

pub use models::*;
