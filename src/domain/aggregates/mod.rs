//! Aggregates module
pub mod product;
pub mod order;
pub mod user;

pub use product::{Product, ProductDetails};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus};
pub use user::{Session, User, UserRole};
