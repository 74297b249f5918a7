//! Authentication: password hashing, JWTs and request extractors
pub mod extractor;
pub mod jwt;
pub mod password;

pub use extractor::{AdminUser, CurrentUser};
pub use jwt::{Claims, JwtError, JwtService, TokenType};
