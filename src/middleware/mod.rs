//! Middleware for the RentHub API
//!
//! Request logging and authentication extractors. Security headers are
//! applied with tower-http layers in `main`.

pub mod auth;
mod request_log;

pub use auth::{AuthenticatedUser, ModeratorUser};
pub use request_log::request_log;
