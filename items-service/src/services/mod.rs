pub mod item_repository;
pub mod jwt;

pub use item_repository::ItemRepository;
pub use jwt::{IdentityClaims, TokenError, TokenVerifier};
