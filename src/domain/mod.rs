pub mod detection;
pub mod errors;
pub mod image;
pub mod session;
pub mod settings;
