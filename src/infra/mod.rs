pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod http_client;
pub mod setup;

pub use error::InfraError;
