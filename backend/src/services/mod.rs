//! Business logic services for the Hotel Operations Platform

pub mod adjustment;
pub mod balance;
pub mod destination;
pub mod issuance;
pub mod item;
pub mod lot;
pub mod sale;
pub mod stock;
