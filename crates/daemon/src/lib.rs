pub mod cli;
pub mod config;
pub mod http_server;

pub use config::{Config, StoreConfig};
pub use http_server::{router, ServiceState};
