pub mod api;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod combobox;
pub mod config;
pub mod error;
pub mod models;

pub use cache::{EntityCache, Filter, Mutation};
pub use error::ApiError;
