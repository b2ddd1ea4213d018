//! Shared types and models for the Hotel Operations Platform
//!
//! This crate contains the domain models, validation rules, and the pure
//! stock-allocation arithmetic shared between the backend and other
//! components of the system.

pub mod allocation;
pub mod models;
pub mod types;
pub mod validation;

pub use allocation::*;
pub use models::*;
pub use types::*;
pub use validation::*;
