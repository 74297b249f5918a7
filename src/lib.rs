//! Storefront order engine
//!
//! Order lifecycle and inventory bookkeeping for a small online shop.
//!
//! ## Features
//! - Order placement that deducts stock atomically across every line
//! - Owner-only cancellation that restores stock
//! - Administrative order status changes
//! - Product catalog management
//! - Account registration and JWT sessions
//! - Post-commit domain events over NATS

pub mod api;
pub mod auth;
pub mod bus;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;

pub use error::{Error, ErrorKind, Result};
pub use service::{AccountService, CatalogService, OrderEngine};
pub use store::{MemoryStore, PgStore, Store};
