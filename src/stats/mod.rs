pub mod aggregate;
pub mod queries;
pub mod ranking;
