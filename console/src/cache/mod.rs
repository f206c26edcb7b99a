pub mod key;
pub mod query;
