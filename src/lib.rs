pub mod audit;
pub mod client_key;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod origin;
pub mod rate_limit;
pub mod request;
pub mod server;
pub mod validation;
pub mod vision;

pub use config::Config;
pub use error::{ConfigError, GatewayError};
pub use gateway::Gateway;
pub use server::{create_app, Server};
