pub mod error;
pub mod message;
pub mod object_proxy;
pub mod observer;
pub mod proxy_config;
pub mod registry;
