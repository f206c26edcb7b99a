pub mod coordinator;
pub mod form;
