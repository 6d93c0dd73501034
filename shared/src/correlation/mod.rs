pub mod broker;
pub mod error;
