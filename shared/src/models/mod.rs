//! Domain models for the Hotel Operations Platform

mod adjustment;
mod balance;
mod destination;
mod issuance;
mod item;
mod lot;
mod sale;

pub use adjustment::*;
pub use balance::*;
pub use destination::*;
pub use issuance::*;
pub use item::*;
pub use lot::*;
pub use sale::*;
