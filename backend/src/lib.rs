//! Sweeter Than Fiction backend: accounts, a browsable discography, per-song
//! comments and a per-user "on my mind" wishlist.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod wishlist;

pub use api::server::{AppState, build_router, start_server};
pub use config::Config;
