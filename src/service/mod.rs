//! Application services
pub mod accounts;
pub mod catalog;
pub mod orders;

pub use accounts::{AccountService, TokenPair};
pub use catalog::CatalogService;
pub use orders::OrderEngine;
