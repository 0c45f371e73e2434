pub mod auth;
pub mod health;
pub mod items;

pub use health::health_check;
