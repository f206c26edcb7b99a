pub mod auth;
pub mod client;
pub mod deployments;
pub mod fetch;
pub mod infrastructure;
pub mod monitoring;
pub mod organizations;
pub mod pipelines;
pub mod projects;
