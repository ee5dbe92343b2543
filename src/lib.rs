pub mod config;
pub mod error;
pub mod routes;
pub mod upload;

pub use config::AppConfig;
pub use error::UploadError;
