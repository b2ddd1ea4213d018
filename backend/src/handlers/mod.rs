//! HTTP handlers for the Hotel Operations Platform

pub mod adjustment;
pub mod balance;
pub mod destination;
pub mod health;
pub mod issuance;
pub mod item;
pub mod lot;
pub mod sale;

pub use adjustment::*;
pub use balance::*;
pub use destination::*;
pub use health::*;
pub use issuance::*;
pub use item::*;
pub use lot::*;
pub use sale::*;

use shared::types::Pagination;

/// Build pagination from optional query parameters
pub(crate) fn pagination(page: Option<u32>, per_page: Option<u32>) -> Pagination {
    let default = Pagination::default();
    Pagination {
        page: page.unwrap_or(default.page),
        per_page: per_page.unwrap_or(default.per_page),
    }
}
