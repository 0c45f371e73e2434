pub mod auth;

pub use auth::{
    AuthResponse, LoginRequest, MessageResponse, PendingConfirmationResponse, RefreshRequest,
    RegisterRequest, UserResponse,
};
