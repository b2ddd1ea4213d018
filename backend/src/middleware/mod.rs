//! Request middleware for the Hotel Operations Platform

pub mod auth;

pub use auth::{auth_middleware, AuthUser, CurrentUser};
