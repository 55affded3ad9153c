pub mod analyze;
pub mod clean;
pub mod config;
pub mod session;
pub mod trends;
