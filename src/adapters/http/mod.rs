pub mod client;
pub mod config;

pub use client::ReqwestDetectionClient;
pub use config::ClientConfig;
