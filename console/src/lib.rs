//! Platform Console Library
//!
//! Session, request dispatch, query cache and mutation core for the DevOps
//! platform console.

pub mod app;
pub mod authn;
pub mod cache;
pub mod errors;
pub mod filesys;
pub mod guard;
pub mod http;
pub mod logs;
pub mod mutation;
pub mod notify;
pub mod session;
pub mod storage;
pub mod utils;
