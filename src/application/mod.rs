pub mod codec;
pub mod dto;
pub mod health;
pub mod ports;
pub mod resource_tracker;
pub mod session;
