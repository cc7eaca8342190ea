mod client;
mod config;
mod device_repository;
mod product_repository;
mod thing_model_repository;

pub use client::*;
pub use config::*;
pub use device_repository::*;
pub use product_repository::*;
pub use thing_model_repository::*;
