pub mod console;
pub mod options;
pub mod views;
