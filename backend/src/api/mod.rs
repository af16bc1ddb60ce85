pub mod auth;
pub mod profile;
pub mod server;
pub mod songs;
pub mod views;
pub mod wishlist;
